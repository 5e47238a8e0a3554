use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod bridge;
mod commands;

/// Environment variable holding the log filter (`info` when unset).
const LOG_ENV: &str = "MISSION_FOCUS_LOG";

#[derive(Parser)]
#[command(name = "mission-focus", version, about = "Mission Focus CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine as a native-messaging host on stdin/stdout
    Daemon,
    /// Show today's totals and goal progress
    Status {
        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Zero today's totals
    Reset,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Classify a video from its title and description
    Classify {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Skip the remote classifier even when a key is configured
        #[arg(long)]
        no_remote: bool,
    },
    /// Credential management for the remote classifier
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Leaderboard backend
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Daemon => commands::daemon::run(),
        Commands::Status { json } => commands::status::run(json),
        Commands::Reset => commands::status::reset(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Classify {
            title,
            description,
            no_remote,
        } => commands::classify::run(&title, &description, no_remote),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Sync { action } => commands::sync::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
