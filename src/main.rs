use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use eventsentry::config::{Config, LogFormat, LoggingConfig};
use eventsentry::detect::PipelineInput;
use eventsentry::extract::{EventExtractor, TimestampedLineExtractor};
use eventsentry::model::LstmAutoencoder;
use eventsentry::EventId;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "eventsentry",
    about = "Event-sequence anomaly detection with an LSTM reconstruction model",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (defaults to $EVENTSENTRY_CONFIG, then /etc/eventsentry)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP prediction service
    Serve {
        /// Bind address
        #[arg(long, env = "EVENTSENTRY_BIND")]
        bind: Option<String>,

        /// Model artifact path
        #[arg(long, env = "EVENTSENTRY_MODEL")]
        model: Option<PathBuf>,
    },

    /// Score one log file or event sequence and print the result as JSON
    Score {
        /// Log file to extract event IDs from
        #[arg(long, conflicts_with = "sequence", required_unless_present = "sequence")]
        log_file: Option<PathBuf>,

        /// Comma-separated event IDs, e.g. 10,25,10,3,18,5
        #[arg(long, value_delimiter = ',')]
        sequence: Option<Vec<EventId>>,

        /// Model artifact path
        #[arg(long, env = "EVENTSENTRY_MODEL")]
        model: Option<PathBuf>,
    },

    /// Print the event IDs found in a log file
    Extract {
        /// Log file to read
        #[arg(long)]
        log_file: PathBuf,
    },

    /// Show the shape of a model artifact
    InspectModel {
        /// Model artifact path
        #[arg(long, env = "EVENTSENTRY_MODEL")]
        model: Option<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn read_log(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read log file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::resolve(cli.config.as_deref())?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind, model } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(model) = model {
                config.model.path = model;
            }
            tracing::info!(
                bind = %config.server.bind,
                model = %config.model.path.display(),
                "Starting EventSentry"
            );
            eventsentry::serve(config).await?;
        }
        Commands::Score {
            log_file,
            sequence,
            model,
        } => {
            if let Some(model) = model {
                config.model.path = model;
            }
            let pipeline = eventsentry::build_pipeline(&config)?;
            if !pipeline.is_ready() {
                bail!("model could not be loaded from {}", config.model.path.display());
            }

            let input = match (log_file, sequence) {
                (Some(path), _) => PipelineInput::Text(read_log(&path)?),
                (None, Some(seq)) => PipelineInput::Sequence(seq),
                (None, None) => bail!("either --log-file or --sequence is required"),
            };
            let detection = pipeline.analyze(input).await?;
            println!("{}", serde_json::to_string_pretty(&detection)?);
        }
        Commands::Extract { log_file } => {
            let text = read_log(&log_file)?;
            let ids = TimestampedLineExtractor::new().extract(&text);
            tracing::info!(count = ids.len(), "extracted event ids");
            println!("{}", serde_json::to_string(&ids)?);
        }
        Commands::InspectModel { model } => {
            let path = model.unwrap_or(config.model.path);
            let model = LstmAutoencoder::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&model.summary())?);
        }
    }

    Ok(())
}
