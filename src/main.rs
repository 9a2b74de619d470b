mod commands;
mod db;
mod error;
mod models;
mod services;
mod sheet;
mod utils;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::clients::ClientPayload;
use crate::commands::documents::GeneratePayload;
use crate::models::{ColumnMapping, Settings};
use crate::services::state::AppState;

#[derive(Parser)]
#[command(name = "dayfill")]
#[command(about = "Track working days per client and fill invoice and timesheet templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clients
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
    /// Work days of one client and month
    Month {
        #[command(subcommand)]
        command: MonthCommand,
    },
    /// Fill a template for a client and month
    ///
    /// The output keeps the template's values and formulas plus the weekend
    /// shading written here. Fonts, borders, column widths, merged cells and
    /// existing fills are not carried over.
    Generate {
        #[arg(long)]
        client: String,
        #[arg(long)]
        month: String,
        #[arg(long = "type", default_value = "invoice")]
        doc_type: String,
        #[arg(long)]
        template: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Fill instructions, overriding the client's stored ones
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List generated documents
    Documents {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        outdated: bool,
    },
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum ClientCommand {
    Add {
        name: String,
        #[arg(long, value_parser = parse_number)]
        rate: Option<f64>,
        #[arg(long, value_parser = parse_number)]
        hours_per_day: Option<f64>,
        /// Date column of a one-row-per-day template
        #[arg(long, requires = "hours_col")]
        date_col: Option<String>,
        #[arg(long, requires = "date_col")]
        hours_col: Option<String>,
        #[arg(long)]
        description_col: Option<String>,
        #[arg(long, default_value_t = 2)]
        start_row: u32,
        #[arg(long)]
        no_date_sync: bool,
        #[arg(long)]
        instructions: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum MonthCommand {
    Open { client: String, month: String },
    Show { client: String, month: String },
    /// Flip one day between working and not working
    Toggle { client: String, date: String },
    Holidays {
        client: String,
        month: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    Notes {
        client: String,
        month: String,
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set { key: String, value: String },
    TestKey,
}

/// Environment configuration, read from `DAYFILL_*` variables.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    db_path: Option<String>,
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    hint_timeout_secs: Option<u64>,
    holiday_country: Option<String>,
}

impl EnvConfig {
    fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::prefixed("DAYFILL_").from_env::<EnvConfig>()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "dayfill=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env = EnvConfig::from_env().map_err(|e| anyhow!("Environment: {}", e))?;
    let defaults = Settings::default();
    let base = Settings {
        db_path: env.db_path.unwrap_or(defaults.db_path.clone()),
        openai_api_key: env.openai_api_key.filter(|k| !k.trim().is_empty()),
        openai_model: env.openai_model.unwrap_or(defaults.openai_model.clone()),
        hint_timeout_secs: env.hint_timeout_secs.unwrap_or(defaults.hint_timeout_secs),
        holiday_country: env.holiday_country.unwrap_or(defaults.holiday_country.clone()),
        ..defaults
    };

    let db = db::Database::new(PathBuf::from(&base.db_path))?;
    let settings = commands::settings::apply_stored_settings(&db, base);
    let state = AppState::new(db, settings);

    match cli.command {
        Commands::Client { command } => match command {
            ClientCommand::Add {
                name,
                rate,
                hours_per_day,
                date_col,
                hours_col,
                description_col,
                start_row,
                no_date_sync,
                instructions,
            } => {
                let column_mapping = match (date_col, hours_col) {
                    (Some(date_col), Some(hours_col)) => Some(ColumnMapping {
                        date_col: date_col.to_ascii_uppercase(),
                        hours_col: hours_col.to_ascii_uppercase(),
                        description_col: description_col.map(|c| c.to_ascii_uppercase()),
                        start_row,
                        sync_dates: !no_date_sync,
                    }),
                    _ => None,
                };
                let payload = ClientPayload {
                    name,
                    daily_rate: rate,
                    hours_per_day,
                    column_mapping,
                    fill_instructions: instructions,
                };
                print_json(&commands::clients::save_client(payload, &state))
            }
            ClientCommand::List => print_json(&commands::clients::list_clients(&state)),
        },
        Commands::Month { command } => match command {
            MonthCommand::Open { client, month } => {
                print_json(&commands::months::open_month(&client, &month, &state).await)
            }
            MonthCommand::Show { client, month } => {
                print_json(&commands::months::show_month(&client, &month, &state).await)
            }
            MonthCommand::Toggle { client, date } => {
                print_json(&commands::months::toggle_day(&client, &date, &state).await)
            }
            MonthCommand::Holidays { client, month, enabled } => {
                print_json(&commands::months::set_holidays(&client, &month, enabled, &state).await)
            }
            MonthCommand::Notes { client, month, notes } => {
                print_json(&commands::months::set_notes(&client, &month, notes, &state).await)
            }
        },
        Commands::Generate {
            client,
            month,
            doc_type,
            template,
            output,
            instructions,
            description,
        } => {
            let payload = GeneratePayload {
                client,
                month,
                doc_type,
                template,
                output,
                instructions,
                description,
            };
            print_json(&commands::documents::generate(payload, &state).await)
        }
        Commands::Documents { client, month, outdated } => print_json(&commands::documents::list_documents(
            client.as_deref(),
            month.as_deref(),
            outdated,
            &state,
        )),
        Commands::Settings { command } => match command {
            SettingsCommand::Show => print_json(&commands::settings::get_settings(&state)),
            SettingsCommand::Set { key, value } => {
                print_json(&commands::settings::save_setting(&key, &value, &state))
            }
            SettingsCommand::TestKey => {
                let key = state
                    .settings()?
                    .openai_api_key
                    .ok_or_else(|| anyhow!("DAYFILL_OPENAI_API_KEY is not set"))?;
                print_json(&commands::settings::test_openai_key(&key).await)
            }
        },
    }
}

fn parse_number(raw: &str) -> Result<f64, String> {
    utils::parse_decimal(raw).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(result: &Result<T, String>) -> Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        Err(message) => Err(anyhow!("{}", message)),
    }
}
