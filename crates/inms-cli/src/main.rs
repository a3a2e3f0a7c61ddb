//! INMS CLI - sign in, call the API with the stored session, watch for inactivity.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use inms_client::{with_auth_scope, ClientRuntime};
use inms_config::{init_logging, Config, Paths};
use inms_storage::create_credential_store;
use tracing::debug;

/// INMS CLI - talk to the INMS API as a signed-in member.
#[derive(Parser)]
#[command(name = "inms")]
#[command(about = "INMS CLI for authentication and API access")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username or email and password
    Login {
        /// Username or email; prompted for when omitted
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Logout and clear the stored session
    Logout,

    /// Show the local session state
    Status,

    /// Fetch the signed-in user's profile
    Whoami,

    /// GET a path on the API
    Get {
        /// Path relative to the API base URL
        path: String,
    },

    /// POST a JSON body to a path on the API
    Post {
        /// Path relative to the API base URL
        path: String,
        /// JSON request body
        #[arg(short, long, default_value = "{}")]
        data: String,
    },

    /// DELETE a path on the API
    Delete {
        /// Path relative to the API base URL
        path: String,
    },

    /// Upload a file as multipart form data
    Upload {
        /// Path relative to the API base URL
        path: String,
        /// Local file to send
        file: std::path::PathBuf,
        /// Form field name for the file
        #[arg(long, default_value = "file")]
        field: String,
    },

    /// Keep the session open until it expires from inactivity.
    /// Each line read from stdin counts as a key press.
    Watch,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &paths);
    debug!(api_base_url = %config.api_base_url, "Configuration loaded");

    let runtime =
        ClientRuntime::from_config(&config, create_credential_store(&paths.session_file()))?;
    runtime.session().bootstrap().await?;

    let format = cli.format;
    with_auth_scope(runtime, async move {
        match cli.command {
            Commands::Login { username } => commands::login(username, &format).await,
            Commands::Logout => commands::logout(&format).await,
            Commands::Status => commands::status(&format).await,
            Commands::Whoami => commands::whoami(&format).await,
            Commands::Get { path } => commands::get(&path, &format).await,
            Commands::Post { path, data } => commands::post(&path, &data, &format).await,
            Commands::Delete { path } => commands::delete(&path, &format).await,
            Commands::Upload { path, file, field } => {
                commands::upload(&path, &file, &field, &format).await
            }
            Commands::Watch => commands::watch(&format).await,
        }
    })
    .await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
