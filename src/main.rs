use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use ticat_sentiment::{config::Config, SentimentAnalyzer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ticat-sentiment", version)]
#[command(about = "Ticket sentiment classifier", long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "TICAT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the project root from the configuration
    #[arg(short, long)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create model and data directories and check for training data
    Validate,

    /// Train, evaluate and save the model
    Train {
        /// Incremental passes after the initial fit
        #[arg(short, long)]
        iterations: Option<usize>,
    },

    /// Classify text (read from stdin when omitted)
    Predict {
        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },

    /// Print the text exactly as the model sees it
    Preprocess {
        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },

    /// Show project paths and model state
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(root) = cli.project_root {
        config.paths.project_root = root;
    }

    init_tracing(&config);
    tracing::debug!("ticat-sentiment v{}", env!("CARGO_PKG_VERSION"));

    let mut analyzer = SentimentAnalyzer::from_config(&config)?;

    match cli.command {
        Commands::Validate => {
            analyzer.manager_mut().validate_setup()?;
            println!("{}", serde_json::to_string_pretty(&analyzer.manager().project_info())?);
        }

        Commands::Train { iterations } => {
            let iterations = iterations.unwrap_or(config.training.iterations);
            let report = analyzer.manager_mut().train(iterations)?;

            let summary = json!({
                "class_distribution": report.class_distribution,
                "train_samples": report.n_train,
                "validation_samples": report.n_validation,
                "test_samples": report.n_test,
                "initial_fit_epochs": report.initial_fit_epochs,
                "iterations": report.history.len(),
                "final_train_loss": report.history.last().map(|m| m.train_loss),
                "final_val_loss": report.history.last().map(|m| m.val_loss),
                "test_metrics": report.test_metrics.to_tracker_metrics("test"),
                "model_path": report.model_path,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Predict { text } => {
            let text = text_or_stdin(text)?;
            let response = analyzer.respond(&text)?;
            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::Preprocess { text } => {
            let text = text_or_stdin(text)?;
            println!("{}", analyzer.prepare(&text));
        }

        Commands::Info => {
            println!("{}", serde_json::to_string_pretty(&analyzer.manager().project_info())?);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ticat_sentiment={}", config.observability.log_level).into()
    });

    // stdout carries command output, so logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn text_or_stdin(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            Ok(buffer)
        }
    }
}
