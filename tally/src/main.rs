mod api;
mod app_state;
mod http;
mod ingest;
mod settings;
mod stop_flag;
mod sweeper;

use http::setup_http_server;
use sweeper::setup_retention_sweeper;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Analytics event ingestion with dual-scope rate limiting")]
#[clap(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Show current configuration and exit
    Config,
    /// Start the tally server (default)
    Run,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            let app_state = app_state::AppState::new().await?;
            println!("{:#?}", &app_state.settings);
            return Ok(());
        }
        Commands::Run => {
            // Continue with the normal server startup
        }
    }

    init_tracing();

    let app_state = app_state::AppState::new().await?;
    stop_flag::register_signal_handler(&app_state.stop_flag);

    let mut handles = vec![];

    // Setup http server.
    {
        let handle =
            setup_http_server(app_state.clone(), &app_state.settings.api.bind_address).await?;
        handles.push(handle);
    }

    // Setup the retention sweeper for expired rate-limit counters.
    {
        let handle = setup_retention_sweeper(app_state.clone()).await?;
        handles.push(handle);
    }

    loop {
        // Remove and await completed handles
        handles.retain(|handle| !handle.is_finished());

        // Break the loop if no more handles are running
        if handles.is_empty() {
            info!("All tasks are done");
            break;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    }

    Ok(())
}
