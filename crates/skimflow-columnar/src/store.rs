#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ColumnarError, ColumnarResult};
use crate::table::Table;
use crate::types::TableId;
use crate::view::{RowRef, RowView};

/// Finalized tables keyed by identity.
///
/// Cloning a store is cheap: tables are shared, never copied.
#[derive(Clone, Debug, Default)]
pub struct TableStore {
    tables: HashMap<TableId, Arc<Table>>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Arc<Table>) -> ColumnarResult<()> {
        let id = table.id().clone();
        if self.tables.contains_key(&id) {
            return Err(ColumnarError::DuplicateTable { table: id });
        }
        self.tables.insert(id, table);
        Ok(())
    }

    pub fn get(&self, id: &str) -> ColumnarResult<&Arc<Table>> {
        self.tables
            .get(id)
            .ok_or_else(|| ColumnarError::UnknownTable {
                table: TableId::from(id),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tables.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table ids in sorted order.
    pub fn ids(&self) -> Vec<&TableId> {
        let mut ids: Vec<&TableId> = self.tables.keys().collect();
        ids.sort();
        ids
    }

    /// A store holding only the listed tables, sharing them with `self`.
    pub fn scoped<'a, I>(&self, ids: I) -> ColumnarResult<TableStore>
    where
        I: IntoIterator<Item = &'a TableId>,
    {
        let mut scope = TableStore::new();
        for id in ids {
            if !scope.contains(id.as_str()) {
                scope.insert(Arc::clone(self.get(id.as_str())?))?;
            }
        }
        Ok(scope)
    }

    /// Resolve a back-reference into a row of the referenced table.
    pub fn resolve(&self, reference: &RowRef) -> ColumnarResult<RowView<'_>> {
        let table = self.get(reference.table.as_str())?;
        let row_count = table.row_count();
        match usize::try_from(reference.row) {
            Ok(row) if row < row_count => table.row(row),
            _ => Err(ColumnarError::DanglingReference {
                table: reference.table.clone(),
                row: reference.row,
                row_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TableBuilder;
    use crate::table::{ColumnSchema, Schema};
    use crate::types::Value;

    fn store() -> TableStore {
        let events = Schema::new("Collisions", vec![ColumnSchema::float("pos_z")]).unwrap();
        let tracks = Schema::new(
            "Tracks",
            vec![
                ColumnSchema::index("collision_id", "Collisions"),
                ColumnSchema::float("pt"),
            ],
        )
        .unwrap();

        let mut store = TableStore::new();
        store
            .insert(
                TableBuilder::build_from_rows(
                    events,
                    [vec![Value::Float(-3.0)], vec![Value::Float(7.5)]],
                )
                .unwrap(),
            )
            .unwrap();
        store
            .insert(
                TableBuilder::build_from_rows(
                    tracks,
                    [
                        vec![Value::Int(1), Value::Float(0.5)],
                        vec![Value::Int(2), Value::Float(1.5)],
                        vec![Value::Int(-1), Value::Float(2.5)],
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn follow_resolves_valid_index() {
        let store = store();
        let tracks = store.get("Tracks").unwrap();
        let event = tracks.row(0).unwrap().follow("collision_id", &store).unwrap();
        assert_eq!(event.position(), 1);
        assert_eq!(event.f64("pos_z").unwrap(), 7.5);
    }

    #[test]
    fn out_of_bounds_and_negative_indices_dangle() {
        let store = store();
        let tracks = store.get("Tracks").unwrap();

        let err = tracks.row(1).unwrap().follow("collision_id", &store).unwrap_err();
        assert_eq!(
            err,
            ColumnarError::DanglingReference {
                table: TableId::from("Collisions"),
                row: 2,
                row_count: 2,
            }
        );

        let err = tracks.row(2).unwrap().follow("collision_id", &store).unwrap_err();
        assert!(matches!(err, ColumnarError::DanglingReference { row: -1, .. }));
    }

    #[test]
    fn scoped_store_hides_undeclared_tables() {
        let store = store();
        let tracks_id = TableId::from("Tracks");
        let scope = store.scoped([&tracks_id, &tracks_id]).unwrap();
        assert_eq!(scope.ids(), vec![&tracks_id]);

        let tracks = scope.get("Tracks").unwrap();
        assert_eq!(
            tracks.row(0).unwrap().follow("collision_id", &scope).unwrap_err(),
            ColumnarError::UnknownTable {
                table: TableId::from("Collisions")
            }
        );
        assert!(matches!(
            store.scoped([&TableId::from("V0Datas")]),
            Err(ColumnarError::UnknownTable { .. })
        ));
    }

    #[test]
    fn non_index_column_cannot_be_followed() {
        let store = store();
        let tracks = store.get("Tracks").unwrap();
        let err = tracks.row(0).unwrap().index("pt").unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut store = store();
        let again = store.get("Collisions").unwrap().clone();
        assert_eq!(
            store.insert(again),
            Err(ColumnarError::DuplicateTable {
                table: TableId::from("Collisions")
            })
        );
        assert_eq!(store.len(), 2);
        assert!(matches!(
            store.get("Missing"),
            Err(ColumnarError::UnknownTable { .. })
        ));
    }
}
