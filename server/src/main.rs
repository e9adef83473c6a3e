use clap::Parser;
use log::{error, info, warn};
use server::archive::JsonLinesArchive;
use server::network::{Server, ServerConfig};
use server::player::DEFAULT_NOTIFY_DEPTH;
use server::session::SessionOptions;
use shared::DEFAULT_BOARD_SIZE;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "23234")]
    port: u16,

    /// Id of the session created at startup
    #[arg(short, long, default_value = "1")]
    session: String,

    /// Board size of the startup session
    #[arg(short = 'b', long, default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: usize,

    /// Make the startup session a practice session (board can be reset)
    #[arg(long)]
    practice: bool,

    /// Pending notifications kept per connection before coalescing
    #[arg(long, default_value_t = DEFAULT_NOTIFY_DEPTH)]
    notify_depth: usize,

    /// Append finished games to this JSON-lines file on shutdown
    #[arg(short, long)]
    archive: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        address: format!("{}:{}", args.host, args.port),
        default_session: Some(args.session),
        session_options: SessionOptions {
            board_size: args.board_size,
            practice: args.practice,
            notify_depth: args.notify_depth,
        },
    };

    let server = Server::bind(config).await?;
    let registry = server.registry();
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    match args.archive {
        Some(path) => {
            let archive = JsonLinesArchive::new(path);
            let archived = registry.archive_all(&archive).await;
            info!("Archived {} game(s) to {}", archived, archive.path().display());
        }
        None => {
            let live = registry.len().await;
            if live > 0 {
                warn!("No --archive path given; {} session(s) not saved", live);
            }
        }
    }

    Ok(())
}
