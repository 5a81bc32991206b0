use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_app::Application;
use libris_kernel::settings::Settings;

/// Libris book records service
#[derive(Debug, Parser)]
#[command(name = "libris-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service until interrupted
    Serve {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending schema migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            Application::bootstrap(settings).await?.serve().await
        }
        Command::Migrate => {
            // Bootstrapping applies migrations; nothing else to do.
            let app = Application::bootstrap(settings).await?;
            tracing::info!(db = %app.settings().database.url, "migrations complete");
            app.shutdown().await
        }
    }
}
