use anyhow::Result;
use clap::{Parser, Subcommand};

use traffic_eval::analytics::logger;
use traffic_eval::cli::{self, EvaluateInput, OutputFormat};
use traffic_eval::config;
use traffic_eval::observations::WindowQuery;
use traffic_eval::predictor::PredictionRequest;
use traffic_eval::utils::diag;
use traffic_eval::web;

#[derive(Debug, Parser)]
#[command(name = "traffic-eval")]
#[command(about = "Accuracy metrics and tooling for a traffic-prediction service")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compute RMSE, MAE, accuracy and R² once
    Evaluate {
        /// Actual values, comma-separated (requires --predicted)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, requires = "predicted")]
        actual: Option<Vec<f64>>,
        /// Predicted values, comma-separated (requires --actual)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, requires = "actual")]
        predicted: Option<Vec<f64>>,
        /// Observation JSONL file (default: configured path)
        #[arg(long, conflicts_with_all = ["actual", "predicted"])]
        file: Option<String>,
        /// Evaluate only the latest N observations (0 = all)
        #[arg(long)]
        window: Option<usize>,
        /// Only include observations from the last N days
        #[arg(long)]
        days: Option<u32>,
        /// Accuracy tolerance in minutes
        #[arg(long)]
        tolerance: Option<f64>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Request a prediction from the traffic-prediction service
    Predict {
        /// Area name, e.g. "Koramangala"
        #[arg(long)]
        area: String,
        /// Road or intersection name, e.g. "Sony World Junction"
        #[arg(long)]
        road: String,
        /// Clear, Cloudy, Rain or Fog (default: Clear)
        #[arg(long)]
        weather: Option<String>,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Re-evaluate the observation file periodically
    Watch {
        /// Seconds between evaluations
        #[arg(long)]
        interval: Option<u64>,
        /// Evaluate only the latest N observations (0 = all)
        #[arg(long)]
        window: Option<usize>,
        /// Stop after N evaluations
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Show the daily trend of logged evaluations
    History {
        /// Number of days to include (default: 7)
        #[arg(long, default_value = "7")]
        days: u32,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Serve the JSON API
    Serve {
        /// Listen address (default: configured web.addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check prediction service, config, observations and event log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.traffic-eval/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `predictor.url http://host:8000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = config::load();

    diag::init(config.logging.level);
    logger::init(&config.logging);

    match app.command {
        Commands::Evaluate {
            actual,
            predicted,
            file,
            window,
            days,
            tolerance,
            format,
        } => {
            let input = match (actual, predicted) {
                (Some(actual), Some(predicted)) => EvaluateInput::Inline { actual, predicted },
                _ => EvaluateInput::File {
                    path: file,
                    query: WindowQuery {
                        size: window.unwrap_or(config.evaluation.window_size),
                        days,
                    },
                },
            };
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_evaluate(&config, input, tolerance, fmt)
        }
        Commands::Predict {
            area,
            road,
            weather,
            date,
            format,
        } => {
            let request = PredictionRequest::new(&area, &road, weather.as_deref(), date.as_deref())?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_predict(&config, &request, fmt)
        }
        Commands::Watch {
            interval,
            window,
            ticks,
        } => cli::run_watch(&config, interval, window, ticks),
        Commands::History { days, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_history(days, fmt)
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.web.addr.clone());
            web::serve(&addr, config)
        }
        Commands::Health => cli::run_health(&config),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
