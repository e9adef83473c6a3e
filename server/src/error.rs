use crate::player::PlayerId;
use shared::Color;

/// Why a session refused to apply a command. Rejected commands leave the
/// session untouched and notify nobody.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("player {0} is not bound to this session")]
    UnknownPlayer(PlayerId),

    #[error("spectators cannot change the game")]
    Spectator,

    #[error("not your turn, waiting for {expected}")]
    NotYourTurn { expected: Color },

    #[error("cursor cannot leave the board")]
    OffBoard,

    #[error("no cursor to place a stone at")]
    NoCursor,

    #[error("point {row},{col} is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("board reset is only allowed in practice sessions")]
    NotPractice,
}

/// Failures while attaching a connection to a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("unsupported protocol version {0}")]
    Version(u32),

    #[error("board size {0} is not supported")]
    BoardSize(usize),

    #[error("expected a Join or Host packet")]
    UnexpectedPacket,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatcher for session {0} has stopped")]
    Stopped(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
