use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use log::{error, info};

use schemaforge::config::Config;
use schemaforge::provider::{self, Provider};
use schemaforge::version;
use schemaforge::{MigrationProgress, Outcome, SchemaError};

#[derive(Parser)]
#[command(
    name = "schemaforge",
    version,
    about = "schemaforge: versioned schema setup and migration for SQL user stores"
)]
pub struct Cli {
    /// Configuration file (default: schemaforge.toml in the user config directory)
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create the base schema in a database that has none
    #[command(name = "initprovider")]
    InitProvider,

    /// Upgrade an initialized database to the current schema version
    Migrate,

    /// Show the stored and the expected schema version
    Status,
}

/// Process exit status. Scripts can tell "already up to date" apart from
/// "changes applied" and from failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Fatal,
    NoActionRequired,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Fatal => 1,
            // 2 is what clap exits with on usage errors
            ExitStatus::NoActionRequired => 3,
        }
    }
}

impl From<Outcome> for ExitStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::NoActionRequired { .. } => ExitStatus::NoActionRequired,
            Outcome::Initialized { .. } | Outcome::Migrated { .. } => ExitStatus::Success,
            Outcome::Interrupted { .. } => ExitStatus::Fatal,
        }
    }
}

impl Cli {
    pub fn handle_command_line() -> ExitStatus {
        let args = Cli::parse();

        match args.run() {
            Ok(status) => status,
            Err(err) => {
                error!("{}", err);
                eprintln!("Error: {}", err);
                if let SchemaError::NotInitialized { .. } = err {
                    eprintln!("did you forget to run the \"initprovider\" command?");
                }
                ExitStatus::Fatal
            }
        }
    }

    fn run(self) -> Result<ExitStatus, SchemaError> {
        let (config_path, write_default) = match self.config {
            Some(path) => (path, false),
            None => {
                let path = Config::default_path().ok_or_else(|| {
                    SchemaError::ConfigError(
                        "cannot determine the user configuration directory".to_string(),
                    )
                })?;
                (path, true)
            }
        };
        let config = Config::load_config(&config_path, write_default)?;

        // RUST_LOG takes precedence over the configured level
        let _logger = Logger::try_with_env_or_str(&config.logging.level)
            .and_then(|logger| logger.start())
            .map_err(|e| SchemaError::Error(format!("Failed to start logger: {}", e)))?;

        info!("{}", version::info());
        info!("using configuration file {}", config_path.display());

        let provider = provider::open(&config, MigrationProgress::console())?;
        provider.check_availability()?;

        match self.command {
            Command::InitProvider => Self::report(provider.initialize()?),
            Command::Migrate => Self::report(provider.migrate()?),
            Command::Status => Self::status(provider.as_ref()),
        }
    }

    fn report(outcome: Outcome) -> Result<ExitStatus, SchemaError> {
        match outcome {
            Outcome::Initialized { version } => {
                println!("Database initialized, schema version {}", version)
            }
            Outcome::NoActionRequired { version } => {
                println!("Database is already up to date, schema version {}", version)
            }
            Outcome::Migrated { from, to, steps } => println!(
                "Database migrated from schema version {} to {} ({} steps)",
                from, to, steps
            ),
            Outcome::Interrupted { from, reached } => eprintln!(
                "Migration interrupted: schema version {} reached, started at {}",
                reached, from
            ),
        }
        Ok(ExitStatus::from(outcome))
    }

    fn status(provider: &dyn Provider) -> Result<ExitStatus, SchemaError> {
        let status = provider.schema_status()?;

        println!("{}", version::info());
        println!("Provider: {}", provider.dialect());
        match status.stored {
            Some(stored) => println!("Stored schema version: {}", stored),
            None => println!("Stored schema version: not initialized"),
        }
        println!("Expected schema version: {}", status.target);

        Ok(ExitStatus::Success)
    }
}
