mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    EveningArgs, MorningArgs, cmd_clear, cmd_evening, cmd_export, cmd_import, cmd_log,
    cmd_morning, cmd_settings_set, cmd_settings_show, cmd_show, cmd_status,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "memento",
    version,
    about = "A memento mori journal: count down to a chosen date and reflect on each day",
    long_about = "\n  Remember that you will die.\n\n  Set a target date, then answer two questions every morning\n  and three every evening. Entries are kept on this device.\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's countdown and which entries are written
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the target date and passcode
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Write the morning entry
    Morning {
        /// How will you use this day?
        #[arg(long)]
        usage: Option<String>,
        /// Will you regret spending it that way?
        #[arg(long)]
        regret: Option<String>,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Day to write for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the evening entry
    Evening {
        /// What used your life most fully today?
        #[arg(long)]
        most_vital: Option<String>,
        /// What did you waste?
        #[arg(long)]
        waste: Option<String>,
        /// What will you change tomorrow?
        #[arg(long)]
        tomorrow: Option<String>,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
        /// Day to write for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one day's entries
    Show {
        /// Day to show (YYYY-MM-DD, today, yesterday; default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List past days, newest first
    Log {
        /// Which days to list: all, complete, incomplete
        #[arg(short, long, default_value = "all")]
        filter: String,
        /// Only days whose answers contain this text
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export settings and all entries to a JSON backup
    Export {
        /// Output file ("-" for stdout; default: mementomori-backup-<today>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore settings and entries from a JSON backup
    Import {
        /// Backup file to read
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all settings and entries
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Set the target date (must not be in the past)
    Set {
        /// Target date (YYYY-MM-DD)
        target_date: String,
        /// Optional passcode
        #[arg(long)]
        passcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let _logger = logging::init(&config.log_level)?;
    let journal = config.open_journal()?;

    match cli.command {
        Commands::Status { json } => cmd_status(&journal, json),
        Commands::Settings { command } => match command {
            SettingsCommands::Set {
                target_date,
                passcode,
                json,
            } => cmd_settings_set(&journal, &target_date, passcode, json),
            SettingsCommands::Show { json } => cmd_settings_show(&journal, json),
        },
        Commands::Morning {
            usage,
            regret,
            note,
            date,
            json,
        } => cmd_morning(
            &journal,
            MorningArgs {
                usage,
                regret,
                note,
            },
            date.as_deref(),
            json,
        ),
        Commands::Evening {
            most_vital,
            waste,
            tomorrow,
            note,
            date,
            json,
        } => cmd_evening(
            &journal,
            EveningArgs {
                most_vital,
                waste,
                tomorrow,
                note,
            },
            date.as_deref(),
            json,
        ),
        Commands::Show { date, json } => cmd_show(&journal, date.as_deref(), json),
        Commands::Log {
            filter,
            search,
            json,
        } => cmd_log(&journal, &filter, search.as_deref(), json),
        Commands::Export { output, json } => cmd_export(&journal, output.as_deref(), json),
        Commands::Import { file, json } => cmd_import(&journal, &file, json),
        Commands::Clear { yes, json } => cmd_clear(&journal, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(journal, port, &bind, api_key, new_api_key).await
        }
    }
}
