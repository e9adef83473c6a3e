//! Scripted player for exercising a running server. Joins (or hosts) a
//! session, waits for its turn, walks the shared cursor to a random empty
//! point and places a stone there. Passes when the board is full. Every
//! state received is printed.

use clap::Parser;
use rand::seq::SliceRandom;
use shared::{
    read_packet, write_packet, Cell, Color, Command, Direction, Packet, Role, SessionView,
    DEFAULT_BOARD_SIZE, PROTOCOL_VERSION,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:23234")]
    server: String,

    /// Session to join
    #[arg(long, default_value = "1")]
    session: String,

    /// Create the session if it does not exist
    #[arg(long)]
    host: bool,

    /// Board size when hosting
    #[arg(short, long, default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: usize,

    /// Stop after this many of our own turns, placements and passes alike
    #[arg(short, long, default_value = "10")]
    moves: u32,

    /// Delay between cursor steps in milliseconds
    #[arg(short, long, default_value = "100")]
    delay: u64,
}

// Cursor steps from `from` to `to`; from no cursor the first step lands on
// the centre point, whichever direction it is.
fn path_to(size: usize, from: Option<usize>, to: usize) -> Vec<Direction> {
    let mut steps = Vec::new();
    let from = match from {
        Some(index) => index,
        None => {
            steps.push(Direction::Up);
            (size / 2) * size + size / 2
        }
    };

    let (row, col) = (from / size, from % size);
    let (target_row, target_col) = (to / size, to % size);

    for _ in target_row..row {
        steps.push(Direction::Up);
    }
    for _ in row..target_row {
        steps.push(Direction::Down);
    }
    for _ in target_col..col {
        steps.push(Direction::Left);
    }
    for _ in col..target_col {
        steps.push(Direction::Right);
    }
    steps
}

fn choose_target(view: &SessionView) -> Option<usize> {
    let empty: Vec<usize> = view
        .board
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| **cell == Cell::Empty)
        .map(|(i, _)| i)
        .collect();
    empty.choose(&mut rand::thread_rng()).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Place(usize),
    Pass,
}

/// Decides when to act. Placements and passes both use up one of the
/// turns the bot was asked to play.
struct Bot {
    color: Color,
    // Ply count at which we last acted, so the echo of our own cursor steps
    // does not trigger another move.
    acted_at: Option<u32>,
    turns: u32,
}

impl Bot {
    fn new(color: Color) -> Self {
        Self {
            color,
            acted_at: None,
            turns: 0,
        }
    }

    fn on_state(&mut self, view: &SessionView) -> Option<Action> {
        let plies = view.moves + view.passes;
        if view.turn != self.color || self.acted_at == Some(plies) {
            return None;
        }
        self.acted_at = Some(plies);
        self.turns += 1;

        Some(match choose_target(view) {
            Some(target) => Action::Place(target),
            None => Action::Pass,
        })
    }
}

async fn send(stream: &mut TcpStream, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    write_packet(stream, &Packet::Command(command)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);

    let name = format!("bot-{}", std::process::id());
    let hello = if args.host {
        Packet::Host {
            client_version: PROTOCOL_VERSION,
            session: args.session.clone(),
            name,
            board_size: args.board_size,
            practice: false,
        }
    } else {
        Packet::Join {
            client_version: PROTOCOL_VERSION,
            session: args.session.clone(),
            name,
        }
    };
    write_packet(&mut stream, &hello).await?;

    let color = match read_packet(&mut stream).await? {
        Some(Packet::Joined { player_id, role, .. }) => {
            println!("Joined session {} as player {} ({:?})", args.session, player_id, role);
            match role {
                Role::Player(color) => color,
                Role::Spectator => {
                    println!("Session is full, nothing to play");
                    return Ok(());
                }
            }
        }
        Some(Packet::Refused { reason }) => {
            println!("Refused: {}", reason);
            return Ok(());
        }
        other => {
            println!("Expected Joined but got: {:?}", other);
            return Ok(());
        }
    };

    let mut bot = Bot::new(color);

    while bot.turns < args.moves {
        let view = match read_packet(&mut stream).await? {
            Some(Packet::State(view)) => view,
            Some(other) => {
                println!("Unexpected packet: {:?}", other);
                continue;
            }
            None => {
                println!("Server closed the connection");
                return Ok(());
            }
        };

        println!(
            "State: turn {} moves {} passes {} cursor {}",
            view.turn,
            view.moves,
            view.passes,
            view.cursor
                .and_then(|i| view.board.point_name(i))
                .unwrap_or_else(|| "-".to_string())
        );

        match bot.on_state(&view) {
            Some(Action::Place(target)) => {
                for step in path_to(view.board.size(), view.cursor, target) {
                    send(&mut stream, Command::MoveCursor(step)).await?;
                    sleep(Duration::from_millis(args.delay)).await;
                }
                send(&mut stream, Command::PlaceStone).await?;
                println!(
                    "Move {}: {} at {}",
                    view.moves + view.passes,
                    color,
                    view.board.point_name(target).unwrap_or_default()
                );
            }
            Some(Action::Pass) => {
                send(&mut stream, Command::Pass).await?;
                println!("Board full, passing");
            }
            None => {}
        }
    }

    send(&mut stream, Command::Quit).await?;
    println!("Test client finished");
    Ok(())
}
