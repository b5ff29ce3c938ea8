mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "inkdesk",
    about = "Studio OS action layer: list, interpret and dispatch back-office actions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Studio root (default: auto-detect from .inkdesk/)
    #[arg(long, global = true, env = "INKDESK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .inkdesk/config.yaml in the studio root
    Init {
        /// Studio name (default: the directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List the registered actions
    Actions,

    /// Turn a free-text command into a proposed action
    Interpret {
        text: String,

        /// Skip the prompt, but only dispatch if the proposal is this action
        /// type, e.g. create-booking
        #[arg(long, value_name = "TYPE")]
        confirm: Option<String>,

        /// Use an in-memory backend instead of the configured gateway
        #[arg(long)]
        offline: bool,
    },

    /// Dispatch one action directly
    Dispatch {
        /// Action type, e.g. create-booking
        #[arg(value_name = "TYPE")]
        action_type: String,

        /// Payload as a JSON object
        #[arg(long)]
        payload: Option<String>,

        /// Use an in-memory backend instead of the configured gateway
        #[arg(long)]
        offline: bool,
    },

    /// Serve the HTTP API for the command palette and back office
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,

        /// Use an in-memory backend instead of the configured gateway
        #[arg(long)]
        offline: bool,
    },

    /// Show or validate the studio configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Actions => cmd::actions::run(cli.json),
        Commands::Interpret {
            text,
            confirm,
            offline,
        } => cmd::interpret::run(&root, &text, confirm.as_deref(), offline, cli.json),
        Commands::Dispatch {
            action_type,
            payload,
            offline,
        } => cmd::dispatch::run(&root, &action_type, payload.as_deref(), offline, cli.json),
        Commands::Serve {
            port,
            no_open,
            offline,
        } => cmd::serve::run(&root, port, no_open, offline),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
