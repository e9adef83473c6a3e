//! Types shared by the server and the terminal client: board state, the
//! session snapshot sent to viewers, and the framed wire protocol.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_BOARD_SIZE: usize = 9;
pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 19;
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Placement state of one board position
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Black,
    White,
}

/// Stone color of a seat or of the side to move
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// Square grid of cells with bounds-checked access
///
/// The cell vector always holds exactly `size * size` entries. Every accessor
/// returns `None` (or `false`) for coordinates outside the grid instead of
/// panicking or wrapping onto the next row.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Empty board; `size` is clamped to `MIN_BOARD_SIZE..=MAX_BOARD_SIZE`
    pub fn new(size: usize) -> Self {
        let size = size.clamp(MIN_BOARD_SIZE, MAX_BOARD_SIZE);
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Linear index of `(row, col)`, or `None` when either is off the board
    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.size && col < self.size {
            Some(row * self.size + col)
        } else {
            None
        }
    }

    /// Inverse of [`Board::index`]
    pub fn coords(&self, index: usize) -> Option<(usize, usize)> {
        if index < self.cells.len() {
            Some((index / self.size, index % self.size))
        } else {
            None
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|i| self.cells[i])
    }

    pub fn at(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Writes `cell` at `(row, col)`. Out-of-range writes are ignored and
    /// reported by returning false.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        match self.index(row, col) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    /// Human-readable coordinate of a point, column letter then 1-based row
    /// (index 40 on a 9x9 board is "E5")
    pub fn point_name(&self, index: usize) -> Option<String> {
        let (row, col) = self.coords(index)?;
        let column = (b'A' + (col % 26) as u8) as char;
        Some(format!("{}{}", column, row + 1))
    }

    /// Number of cells currently holding `cell`
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Abstract per-connection intents, independent of any key layout
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveCursor(Direction),
    PlaceStone,
    Pass,
    /// Clears the board; only honoured by practice sessions
    Reset,
    Quit,
}

/// What a connection is allowed to do in its session
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Spectator,
}

impl Role {
    pub fn color(self) -> Option<Color> {
        match self {
            Role::Player(color) => Some(color),
            Role::Spectator => None,
        }
    }
}

/// Point-in-time copy of everything a viewer needs to redraw the game
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: String,
    pub board: Board,
    pub cursor: Option<usize>,
    pub last: Option<usize>,
    pub turn: Color,
    pub moves: u32,
    pub passes: u32,
    pub black: Option<String>,
    pub white: Option<String>,
    pub spectators: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Join {
        client_version: u32,
        session: String,
        name: String,
    },
    Host {
        client_version: u32,
        session: String,
        name: String,
        board_size: usize,
        practice: bool,
    },
    Command(Command),

    Joined {
        player_id: u32,
        role: Role,
        board_size: usize,
    },
    State(SessionView),
    Refused {
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {0} bytes exceeds the size limit")]
    TooLarge(usize),
}

/// Writes one length-prefixed frame: a big-endian `u32` byte count followed
/// by the bincode encoding of `packet`.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let data = bincode::serialize(packet)?;
    if data.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(data.len()));
    }

    writer.write_u32(data.len() as u32).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame written by [`write_packet`]. Returns `Ok(None)` when the
/// peer closed the stream cleanly between frames; a stream that ends inside
/// a frame, header included, is an I/O error.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<Packet>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    header[0] = match reader.read_u8().await {
        Ok(byte) => byte,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // Once a frame has started, running out of bytes is an error.
    reader.read_exact(&mut header[1..]).await?;
    let len = u32::from_be_bytes(header) as usize;

    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(bincode::deserialize(&buffer)?))
}
