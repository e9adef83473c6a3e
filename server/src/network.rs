//! Server network layer: TCP accept loop and per-connection session loops

use crate::error::SessionError;
use crate::player::PlayerHandle;
use crate::registry::{SessionEntry, SessionRegistry};
use crate::session::SessionOptions;
use log::{debug, error, info, warn};
use shared::{read_packet, write_packet, Command, FrameError, Packet, PROTOCOL_VERSION};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const INBOUND_QUEUE: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    /// Session created at startup so `Join` works without a host
    pub default_session: Option<String>,
    /// Defaults for sessions created at startup; `Host` packets bring their
    /// own board size and practice flag.
    pub session_options: SessionOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:23234".to_string(),
            default_session: Some("1".to_string()),
            session_options: SessionOptions::default(),
        }
    }
}

/// Accepts connections and binds each one to a game session
pub struct Server {
    listener: TcpListener,
    registry: SessionRegistry,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: SessionRegistry::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the live sessions, e.g. for archiving on shutdown
    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// Runs the accept loop until the task is dropped
    pub async fn run(self) -> io::Result<()> {
        if let Some(id) = &self.config.default_session {
            if let Err(e) = self
                .registry
                .get_or_create(id, &self.config.session_options)
                .await
            {
                error!("Could not create default session {}: {}", id, e);
            }
        }

        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    info!("Client connected from {}", addr);
                    let registry = self.registry.clone();
                    let options = self.config.session_options.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, addr, registry, options).await {
                            warn!("Connection {} ended with error: {}", addr, e);
                        }
                        info!("Client {} disconnected", addr);
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Resolves the opening packet of a connection to a session and a name
async fn open_session(
    registry: &SessionRegistry,
    packet: Packet,
    defaults: &SessionOptions,
) -> Result<(SessionEntry, String), SessionError> {
    match packet {
        Packet::Join {
            client_version,
            session,
            name,
        } => {
            check_version(client_version)?;
            let entry = registry.lookup(&session).await?;
            Ok((entry, name))
        }
        Packet::Host {
            client_version,
            session,
            name,
            board_size,
            practice,
        } => {
            check_version(client_version)?;
            let options = SessionOptions {
                board_size,
                practice,
                notify_depth: defaults.notify_depth,
            };
            let entry = registry.get_or_create(&session, &options).await?;
            Ok((entry, name))
        }
        _ => Err(SessionError::UnexpectedPacket),
    }
}

fn check_version(client_version: u32) -> Result<(), SessionError> {
    if client_version == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(SessionError::Version(client_version))
    }
}

async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    registry: SessionRegistry,
    defaults: SessionOptions,
) -> Result<(), FrameError> {
    socket.set_nodelay(true)?;
    let (mut reader, mut writer) = socket.into_split();

    let Some(hello) = read_packet(&mut reader).await? else {
        return Ok(());
    };

    let (entry, name) = match open_session(&registry, hello, &defaults).await {
        Ok(opened) => opened,
        Err(e) => {
            warn!("Refusing {}: {}", addr, e);
            let refusal = Packet::Refused {
                reason: e.to_string(),
            };
            write_packet(&mut writer, &refusal).await?;
            return Ok(());
        }
    };

    let mut handle = entry.session.write().await.bind(name);
    let player_id = handle.id();
    let board_size = entry.session.read().await.board().size();

    let joined = Packet::Joined {
        player_id,
        role: handle.role(),
        board_size,
    };

    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let reader_task = tokio::spawn(read_commands(reader, inbound_tx, addr));

    let result = match write_packet(&mut writer, &joined).await {
        Ok(()) => session_loop(&entry, &mut handle, &mut inbound_rx, &mut writer).await,
        Err(e) => Err(e),
    };

    reader_task.abort();
    entry.session.write().await.unbind(player_id);
    result
}

/// Decodes frames into commands until the peer goes away
async fn read_commands(mut reader: OwnedReadHalf, tx: mpsc::Sender<Command>, addr: SocketAddr) {
    loop {
        match read_packet(&mut reader).await {
            Ok(Some(Packet::Command(command))) => {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Ok(Some(other)) => {
                warn!("Unexpected packet from {}: {:?}", addr, other);
            }
            Ok(None) => {
                debug!("{} closed its stream", addr);
                break;
            }
            Err(e) => {
                warn!("Dropping {}: {}", addr, e);
                break;
            }
        }
    }
}

async fn send_state(entry: &SessionEntry, writer: &mut OwnedWriteHalf) -> Result<(), FrameError> {
    let view = entry.session.read().await.view();
    write_packet(writer, &Packet::State(view)).await
}

/// Waits for either this connection's next command or a change made by
/// someone else, whichever comes first.
async fn session_loop(
    entry: &SessionEntry,
    handle: &mut PlayerHandle,
    inbound: &mut mpsc::Receiver<Command>,
    writer: &mut OwnedWriteHalf,
) -> Result<(), FrameError> {
    send_state(entry, writer).await?;

    loop {
        tokio::select! {
            command = inbound.recv() => {
                let Some(command) = command else {
                    break;
                };

                if command == Command::Quit {
                    info!("Player {} ({}) quit", handle.id(), handle.name());
                    break;
                }

                let outcome = entry.session.write().await.apply(handle.id(), command);
                match outcome {
                    Ok(applied) if applied.is_mutation() => {
                        match entry.dispatcher.publish(handle.id()).await {
                            Ok(report) => debug!("Player {} change fanned out: {:?}", handle.id(), report),
                            Err(e) => warn!("{}", e),
                        }
                        send_state(entry, writer).await?;
                    }
                    Ok(_) => {}
                    Err(rejected) => {
                        debug!("Rejected {:?} from player {}: {}", command, handle.id(), rejected);
                    }
                }
            },

            note = handle.notified() => {
                match note {
                    Some(_) => send_state(entry, writer).await?,
                    None => break,
                }
            },
        }
    }

    Ok(())
}
