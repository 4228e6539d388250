use anyhow::Result;
use clap::{Parser, Subcommand};
use hark_common::{logger, AppConfig};
use std::path::PathBuf;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
            return;
        }
    }
    // Fallback to default dotenv behavior
    dotenv::dotenv().ok();
}

#[derive(Parser)]
#[command(name = "hark")]
#[command(about = "Hark - speech-to-text transcription service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind to
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Transcription backend: "local" or "remote"
        #[arg(long)]
        backend: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env at project root.
    // AppConfig::from_env() also loads .env, but doing it here first keeps
    // CLI argument overrides ahead of file values.
    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            backend,
        }) => {
            // Override with CLI arguments
            std::env::set_var("SERVER_HOST", &host);
            std::env::set_var("SERVER_PORT", port.to_string());
            if let Some(kind) = &backend {
                std::env::set_var("BACKEND_KIND", kind);
            }

            let config = AppConfig::from_env()?;
            logger::setup_logging(&config.log_dir, &config.log_level)?;

            tracing::info!("Hark starting...");
            tracing::info!("  Bind: {}:{}", host, port);
            tracing::info!("  Backend: {}", config.backend_kind);
            tracing::info!("  Request timeout: {}s", config.request_timeout_seconds);

            println!("Server listening on http://{}:{}", host, port);

            hark_server::start_server(config).await?;
        }
        None => {
            let config = AppConfig::from_env()?;
            logger::setup_logging(&config.log_dir, &config.log_level)?;

            tracing::info!("Hark starting with default configuration...");
            tracing::info!("  Backend: {}", config.backend_kind);

            println!("Server listening on http://{}", config.server_bind_address());

            hark_server::start_server(config).await?;
        }
    }

    Ok(())
}
