//! LoopShare - collect video links into playlists, play them, and share them.
//!
//! This is the entry point of the command-line front end.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use loopshare_core::billing::Plan;
use loopshare_core::resolver::ThumbnailQuality;
use tracing::{Level, debug};

use commands::{AppState, CommandResult, map_err};
use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "loopshare", version)]
#[command(about = "Collect, play and share video playlists", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LOOPSHARE_CONFIG")]
    config: Option<PathBuf>,
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print errors as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the embed and thumbnail URLs a video link resolves to
    Resolve {
        /// Video link
        url: String,
        /// Thumbnail size
        #[arg(short, long, default_value_t = ThumbnailQuality::HqDefault)]
        quality: ThumbnailQuality,
    },
    /// List your playlists
    List,
    /// List everyone's public playlists
    Explore,
    /// Create a private playlist
    Create {
        /// Playlist name
        name: String,
    },
    /// Add a video to a playlist
    Add {
        /// Playlist id or name
        playlist: String,
        /// Video link
        url: String,
        /// Video title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Remove a video from a playlist
    Remove {
        /// Playlist id or name
        playlist: String,
        /// Video id, or its position in the playlist starting at 1
        video: String,
    },
    /// Make a playlist public or private
    Toggle {
        /// Playlist id or name
        playlist: String,
    },
    /// Show what is playing in a playlist
    Play {
        /// Playlist id or name
        playlist: String,
        /// Position of the video to play, starting at 1
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Print the link to a playlist
    Share {
        /// Playlist id or name
        playlist: String,
    },
    /// Compare subscription plans
    Plans,
    /// Manage your subscription
    #[command(subcommand)]
    Subscription(SubscriptionCommand),
}

#[derive(Subcommand)]
enum SubscriptionCommand {
    /// Show your current plan
    Status,
    /// Start a checkout for a plan
    Checkout {
        /// individual, business, enterprise or lifetime
        plan: Plan,
    },
    /// Open the customer portal
    Portal {
        /// Go straight to changing plans
        #[arg(long)]
        downgrade: bool,
    },
    /// Pause billing
    Pause {
        /// Number of days (default 30)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::auto();
    if cli.verbose {
        logging_config = logging_config.with_console_level(Level::DEBUG);
    }
    let _guard = match logging::init(&logging_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {e}");
            None
        }
    };

    match run(cli.command, cli.config).await {
        Ok(out) => {
            if !out.is_empty() {
                println!("{out}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_json());
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Option<PathBuf>) -> CommandResult {
    // These two never touch the configuration.
    if let Commands::Resolve { url, quality } = &command {
        return commands::resolve(url, *quality);
    }
    if matches!(command, Commands::Plans) {
        return commands::plans();
    }

    let state = AppState::load(config).await.map_err(map_err)?;
    debug!("Application state ready");

    match command {
        Commands::Resolve { url, quality } => commands::resolve(&url, quality),
        Commands::Plans => commands::plans(),
        Commands::List => commands::list(&state).await,
        Commands::Explore => commands::explore(&state).await,
        Commands::Create { name } => commands::create(&state, &name).await,
        Commands::Add {
            playlist,
            url,
            title,
        } => commands::add(&state, &playlist, &url, title.as_deref()).await,
        Commands::Remove { playlist, video } => {
            commands::remove(&state, &playlist, &video).await
        }
        Commands::Toggle { playlist } => commands::toggle(&state, &playlist).await,
        Commands::Play { playlist, index } => commands::play(&state, &playlist, index).await,
        Commands::Share { playlist } => commands::share(&state, &playlist).await,
        Commands::Subscription(sub) => match sub {
            SubscriptionCommand::Status => commands::status(&state).await,
            SubscriptionCommand::Checkout { plan } => commands::checkout(&state, plan).await,
            SubscriptionCommand::Portal { downgrade } => {
                commands::portal(&state, downgrade).await
            }
            SubscriptionCommand::Pause { days } => commands::pause(&state, days).await,
        },
    }
}
