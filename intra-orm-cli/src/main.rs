mod check;
mod get;
mod schema;

use clap::{Parser, Subcommand};
use check::CheckSchema;
use get::Get;
use intra_orm::{Connector, ConnectorConfig};
use schema::GenerateSchema;
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::{format, layer},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Subcommand, Debug)]
enum Subcommands {
    Get(Get),
    CheckSchema(CheckSchema),
    GenerateSchema(GenerateSchema),
}

#[derive(Parser, Debug)]
struct Args {
    /// The URL of the database. If left unset, the connection is configured from the
    /// environment (`DATABASE_URL`, or `DB_HOST`, `DB_USER`, `DB_NAME` and friends), or from a
    /// corresponding `.env` file.
    #[arg(short, long, global = true, value_name = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log every statement sent to the database.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Subcommands,
}

impl Args {
    fn connector(&self) -> eyre::Result<Connector> {
        let mut config = match &self.database_url {
            Some(url) => ConnectorConfig::new(url),
            None => ConnectorConfig::from_env()?,
        };
        config.log_statements |= self.verbose;

        Ok(Connector::new(&config)?)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(if args.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .with(layer().event_format(format().without_time().with_target(false).compact()))
        .init();

    intra_orm_models::register_all();

    let connector = match args.connector() {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to configure the database connection: {e}");
            return;
        }
    };

    let r = match &args.command {
        Subcommands::Get(cmd) => cmd.run(&connector).await,
        Subcommands::CheckSchema(cmd) => cmd.run(&connector).await,
        Subcommands::GenerateSchema(cmd) => cmd.run(&connector).await,
    };

    if let Err(e) = r {
        error!("Command execution failed: {e}");
    }

    if let Err(e) = connector.close().await {
        error!("Failed to close the database connection: {e}");
    }
}
