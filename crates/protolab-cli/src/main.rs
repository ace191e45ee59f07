use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod script;

#[derive(Parser)]
#[command(name = "protolab")]
#[command(about = "Protolab - guardrailed idea-to-prototype agent pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Offline walkthroughs over scripted collaborators
    Demo {
        #[command(subcommand)]
        action: DemoAction,
    },
    /// Configuration checks
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum DemoAction {
    /// Session management and cost tracking
    Session,
    /// Retry backoff and circuit breaker behavior
    Resilience,
    /// Sequential and delegated pipeline runs
    Pipeline {
        /// Project name to build
        #[arg(long, default_value = "runner-habits")]
        project: String,
        /// User the run executes on behalf of
        #[arg(long, default_value = "demo-user-123")]
        user: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Verify gateway credentials resolve
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { action } => match action {
            DemoAction::Session => commands::demo::session().await?,
            DemoAction::Resilience => commands::demo::resilience().await?,
            DemoAction::Pipeline { project, user } => {
                commands::demo::pipeline(&project, &user).await?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Check => commands::config::check()?,
        },
    }

    Ok(())
}
