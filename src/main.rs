use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "quickboard")]
#[command(version, about = "Personal task board with autosave")]
pub struct Cli {
    /// Path to a quickboard.toml (defaults to ./quickboard.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Board service URL. Overrides QUICKBOARD_SERVER_URL and the config file.
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board service
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (permissive CORS, listen on all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Create an account, then log in with it
    Register {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the board
    Board {
        /// Only show cards whose title, notes or tag contain this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add, rename, delete or reorder columns
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Add, move, edit, toggle or delete cards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ColumnCommands {
    /// Append a new column
    Add { title: String },
    /// Rename a column (by id or title)
    Rename { column: String, title: String },
    /// Delete a column and every card in it
    Delete {
        column: String,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Move the column at position FROM to position TO (0-based)
    Move { from: usize, to: usize },
}

#[derive(Subcommand, Clone)]
pub enum CardCommands {
    /// Append a card to a column
    Add { column: String, title: String },
    /// Move a card to a column, at the end unless --index is given
    Move {
        card: String,
        column: String,
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Change a card's fields
    Edit {
        card: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Meeting, Urgent, Idea or General
        #[arg(long)]
        tag: Option<String>,
        /// pending, in-progress or completed
        #[arg(long)]
        status: Option<String>,
    },
    /// Mark completed, or back to pending if already completed
    Toggle { card: String },
    /// Delete a card
    Delete { card: String },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    quickboard::logging::init(default_level);

    let config = cmd::load_config(&cli)?;

    match &cli.command {
        Commands::Serve { port, db_path, dev } => {
            cmd::cmd_serve(config, *port, db_path.clone(), *dev).await?;
        }
        Commands::Register { username } => {
            cmd::cmd_register(&config, username.as_deref()).await?;
        }
        Commands::Login { username } => {
            cmd::cmd_login(&config, username.as_deref()).await?;
        }
        Commands::Logout => cmd::cmd_logout(&config)?,
        Commands::Board { search } => cmd::cmd_board(&config, search.as_deref()).await?,
        Commands::Column { command } => cmd::cmd_column(&config, command.clone()).await?,
        Commands::Card { command } => cmd::cmd_card(&config, command.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
