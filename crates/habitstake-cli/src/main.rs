use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

const LOG_ENV: &str = "HABITSTAKE_LOG";

#[derive(Parser)]
#[command(name = "habitstake-cli", version, about = "Habitstake CLI")]
struct Cli {
    /// Evaluate as if the local time were this RFC 3339 instant
    #[arg(long, global = true)]
    at: Option<DateTime<FixedOffset>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Answer pending check-ins
    Checkin {
        #[command(subcommand)]
        action: commands::checkin::CheckinAction,
    },
    /// Wallet balance and deposits
    Wallet {
        #[command(subcommand)]
        action: commands::wallet::WalletAction,
    },
    /// Completion statistics
    Stats(commands::stats::StatsArgs),
    /// Local reminder plan
    Reminders {
        #[command(subcommand)]
        action: commands::reminders::RemindersAction,
    },
    /// Run the poll loop with local reminder timers
    Watch(commands::watch::WatchArgs),
    /// Push device registry
    Device {
        #[command(subcommand)]
        action: commands::device::DeviceAction,
    },
    /// Server-side periodic reminder tick
    Cron {
        #[command(subcommand)]
        action: commands::cron::CronAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let at = cli.at;
    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action, at),
        Commands::Checkin { action } => commands::checkin::run(action, at),
        Commands::Wallet { action } => commands::wallet::run(action, at),
        Commands::Stats(args) => commands::stats::run(args, at),
        Commands::Reminders { action } => commands::reminders::run(action, at),
        Commands::Watch(args) => commands::watch::run(args),
        Commands::Device { action } => commands::device::run(action, at),
        Commands::Cron { action } => commands::cron::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
