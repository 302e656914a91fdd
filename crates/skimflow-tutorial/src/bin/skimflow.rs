use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    skimflow_tutorial::cli::run()
}
