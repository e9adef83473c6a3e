use crate::input::{help_line, map_key};
use crate::rendering::{Renderer, TerminalGuard};
use crossterm::event::{self, Event};
use log::{debug, info, warn};
use shared::{read_packet, write_packet, Command, Packet, Role, SessionView};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const KEY_POLL: Duration = Duration::from_millis(100);
const QUEUE_DEPTH: usize = 32;

/// What the server told us when it accepted the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub player_id: u32,
    pub role: Role,
    pub board_size: usize,
}

pub struct Client {
    stream: TcpStream,
    seat: Seat,
    renderer: Renderer,
}

impl Client {
    /// Connects and performs the join/host handshake. A refusal from the
    /// server comes back as an error carrying its reason.
    pub async fn connect(
        server_addr: &str,
        hello: Packet,
        renderer: Renderer,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to {}...", server_addr);
        let mut stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;

        let seat = handshake(&mut stream, &hello).await?;
        info!(
            "Joined as player {} ({:?}) on a {}x{} board",
            seat.player_id, seat.role, seat.board_size, seat.board_size
        );

        Ok(Client {
            stream,
            seat,
            renderer,
        })
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Runs until the user quits or the server goes away
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Client {
            stream,
            seat,
            renderer,
        } = self;
        let (mut reader, mut writer) = stream.into_split();
        let guard = TerminalGuard::new()?;

        let (key_tx, mut keys) = mpsc::channel(QUEUE_DEPTH);
        let key_task = tokio::task::spawn_blocking(move || read_keys(key_tx));

        let (packet_tx, mut packets) = mpsc::channel(QUEUE_DEPTH);
        let reader_task = tokio::spawn(async move {
            loop {
                match read_packet(&mut reader).await {
                    Ok(Some(packet)) => {
                        if packet_tx.send(packet).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Connection error: {}", e);
                        break;
                    }
                }
            }
        });

        let mut last_view: Option<SessionView> = None;
        let farewell = loop {
            tokio::select! {
                command = keys.recv() => {
                    let Some(command) = command else {
                        break "Input closed".to_string();
                    };
                    debug!("Sending {:?}", command);
                    write_packet(&mut writer, &Packet::Command(command)).await?;
                    if command == Command::Quit {
                        break "Bye".to_string();
                    }
                },

                packet = packets.recv() => {
                    match packet {
                        Some(Packet::State(view)) => {
                            let frame = format!(
                                "{}\n\n{}",
                                renderer.render(&view, seat.role),
                                help_line()
                            );
                            guard.draw(&frame)?;
                            last_view = Some(view);
                        }
                        Some(Packet::Refused { reason }) => break format!("Server closed the session: {}", reason),
                        Some(other) => warn!("Unexpected packet: {:?}", other),
                        None => break "Disconnected from server".to_string(),
                    }
                },
            }
        };

        // Closing the channel stops the blocking key reader at its next poll.
        drop(keys);
        reader_task.abort();
        drop(guard);
        let _ = key_task.await;

        if let Some(view) = last_view {
            println!("{}", Renderer::new(false).render(&view, seat.role));
        }
        println!("{}", farewell);
        Ok(())
    }
}

/// Sends `hello` and waits for the server's answer
pub async fn handshake<S>(stream: &mut S, hello: &Packet) -> Result<Seat, Box<dyn std::error::Error>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_packet(stream, hello).await?;

    match read_packet(stream).await? {
        Some(Packet::Joined {
            player_id,
            role,
            board_size,
        }) => Ok(Seat {
            player_id,
            role,
            board_size,
        }),
        Some(Packet::Refused { reason }) => Err(format!("refused by server: {}", reason).into()),
        Some(other) => Err(format!("unexpected handshake reply: {:?}", other).into()),
        None => Err("server closed the connection during handshake".into()),
    }
}

// Runs on a blocking thread; crossterm's reader is synchronous.
fn read_keys(tx: mpsc::Sender<Command>) {
    while !tx.is_closed() {
        match event::poll(KEY_POLL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(command) = map_key(key) {
                        if tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Keyboard error: {}", e);
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                warn!("Keyboard error: {}", e);
                break;
            }
        }
    }
}
