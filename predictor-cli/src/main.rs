use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use predictor_core::PredictorConfig;
use predictor_ingest::{initialize_history, parse_date, read_table, save_history, write_table, write_table_path};
use predictor_service::forecast_table;
use std::path::PathBuf;

mod config;
mod logging;
mod state;

#[derive(Parser, Debug)]
#[command(name = "predictor", version, about = "Forecast per-token quantities from dated history")]
struct Cli {
    /// Config file (default: ~/.predictor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter, e.g. `debug` (default from config, then `info`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast every token in the history for one day
    Predict {
        /// History CSV (default from config)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Day to forecast (default: today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Write predictions here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        overrides: ForecastOverrides,
    },

    /// History file maintenance
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Config file management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ForecastOverrides {
    /// Use the remote forecasting service
    #[arg(long)]
    remote: bool,

    /// Remote service URL (implies --remote)
    #[arg(long)]
    endpoint: Option<String>,

    /// Period length in days for the eligibility windows
    #[arg(long)]
    period_days: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// Append a sheet to the history, stamping plain rows with a date
    Save {
        /// Current sheet CSV
        #[arg(long)]
        sheet: PathBuf,

        #[arg(long)]
        history: Option<PathBuf>,

        /// Date stamped on plain rows (default: today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Build the history from a directory of date-named sheets
    Init {
        #[arg(long)]
        sheets_dir: Option<PathBuf>,

        #[arg(long)]
        history: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.predictor/config.toml
    Init,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("not a date: {s}"))
}

fn apply_overrides(mut cfg: PredictorConfig, overrides: &ForecastOverrides) -> PredictorConfig {
    if overrides.remote {
        cfg.use_remote = true;
    }
    if let Some(url) = &overrides.endpoint {
        cfg.use_remote = true;
        cfg.forecast_endpoint_url = url.clone();
    }
    if let Some(days) = overrides.period_days {
        cfg.period_length_days = Some(days);
    }
    cfg
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(p) => config::load_config_from(p)?,
        None => config::load_config()?,
    };
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log.level);
    let _logger = logging::init_logging(level, cfg.log.dir.as_deref())?;

    match cli.command {
        Command::Predict {
            history,
            date,
            out,
            overrides,
        } => {
            let history_path = match history {
                Some(p) => p,
                None => cfg.history_path()?,
            };
            if !history_path.exists() {
                bail!(
                    "history not found: {} (run `predictor history init` or pass --history)",
                    history_path.display()
                );
            }

            let predictor_cfg = apply_overrides(cfg.predictor.clone(), &overrides);
            predictor_cfg.validate().context("invalid predictor config")?;

            let date = date.unwrap_or_else(today);
            let table = read_table(&history_path)?;
            let predicted = forecast_table(&table, date, &predictor_cfg)
                .with_context(|| format!("forecasting from {}", history_path.display()))?;

            match out {
                Some(p) => {
                    write_table_path(&p, &predicted)?;
                    info!("wrote {} predictions to {}", predicted.len(), p.display());
                }
                None => write_table(std::io::stdout().lock(), &predicted)?,
            }
        }

        Command::History { command } => match command {
            HistoryCommand::Save {
                sheet,
                history,
                date,
            } => {
                let history_path = match history {
                    Some(p) => p,
                    None => cfg.history_path()?,
                };
                let current = read_table(&sheet)?;
                let n = save_history(&current, &history_path, date.unwrap_or_else(today))?;
                println!("Saved {} rows from {} into {}", n, sheet.display(), history_path.display());
            }
            HistoryCommand::Init {
                sheets_dir,
                history,
            } => {
                let sheets_dir = match sheets_dir {
                    Some(p) => p,
                    None => cfg.sheets_dir()?,
                };
                let history_path = match history {
                    Some(p) => p,
                    None => cfg.history_path()?,
                };
                if history_path.exists() {
                    println!("History already exists: {}", history_path.display());
                } else {
                    let n = initialize_history(&sheets_dir, &history_path)?;
                    println!("Built {} from {} sheets", history_path.display(), n);
                }
            }
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}
