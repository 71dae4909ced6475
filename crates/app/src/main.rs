mod cli;
mod import;
mod reports;
mod telemetry;

use clap::Parser;
use tracing::info;

use employee_mgmt_storage::Database;
use employee_mgmt_util::{load_env_file, AppConfig};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    info!(
        stage = "app",
        env = %config.environment.as_str(),
        database = %config.database_url,
        "opening employee database"
    );

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let output = match cli.command {
        Command::SalaryAverages { on_duplicate_name } => {
            let averages =
                reports::compute_salary_averages(&database, on_duplicate_name.into()).await?;
            serde_json::to_string_pretty(&averages)?
        }
        Command::Hierarchy => {
            let forest = reports::build_hierarchy(&database).await?;
            serde_json::to_string_pretty(&forest)?
        }
        Command::Import { file } => {
            let summary = import::import_file(&database, &file).await?;
            serde_json::to_string_pretty(&summary)?
        }
    };
    println!("{output}");
    Ok(())
}
