use clap::Parser;
use client::{network, rendering};
use log::info;
use rand::Rng;
use shared::{Packet, DEFAULT_BOARD_SIZE, PROTOCOL_VERSION};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:23234")]
    server: String,

    /// Session to join; when hosting without one a random id is picked
    #[arg(long)]
    session: Option<String>,

    /// Display name; a random guest name when omitted
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Create the session if it does not exist yet
    #[arg(long)]
    host: bool,

    /// Board size when hosting
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    size: usize,

    /// Host a practice session where any seated player may clear the board
    #[arg(long)]
    practice: bool,

    /// Draw without colours
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut rng = rand::thread_rng();
    let name = args
        .name
        .unwrap_or_else(|| format!("guest-{:04}", rng.gen_range(0..10_000)));
    let session = match args.session {
        Some(session) => session,
        None if args.host => rng.gen_range(100..1000).to_string(),
        None => "1".to_string(),
    };

    let hello = if args.host {
        info!(
            "Hosting session {} ({}x{}{})",
            session,
            args.size,
            args.size,
            if args.practice { ", practice" } else { "" }
        );
        Packet::Host {
            client_version: PROTOCOL_VERSION,
            session,
            name,
            board_size: args.size,
            practice: args.practice,
        }
    } else {
        Packet::Join {
            client_version: PROTOCOL_VERSION,
            session,
            name,
        }
    };

    let renderer = rendering::Renderer::new(!args.plain);
    let client = network::Client::connect(&args.server, hello, renderer).await?;
    client.run().await?;

    Ok(())
}
