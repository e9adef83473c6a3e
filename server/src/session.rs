//! The shared game aggregate: board, cursor, turn order, move history and
//! the handles bound to one game.
//!
//! Every mutating method checks its precondition and mutates in the same
//! `&mut self` call, so callers holding the session's write lock get an
//! atomic check-then-act. A rejected command returns `Err` and leaves every
//! field untouched.
//!
//! Session rules:
//! - the first connection takes Black, the second White, the rest spectate;
//!   a seat freed by a disconnect goes to the next connection
//! - Black moves first and the turn flips after every placement or pass
//! - a stone may only be placed on an empty point
//! - a pass flips the official turn but is not recorded in the history

use crate::archive::GameSummary;
use crate::error::Rejected;
use crate::player::{
    notification_channel, PlayerHandle, PlayerId, SessionId, Subscriber, DEFAULT_NOTIFY_DEPTH,
};
use crate::utils::get_timestamp;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{Board, Cell, Color, Command, Direction, Role, SessionView, DEFAULT_BOARD_SIZE};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedSession = Arc<RwLock<GameSession>>;

/// One accepted placement. `turn` equals the move's position in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub turn: u32,
    pub player: Color,
    pub row: usize,
    pub col: usize,
    pub timestamp: u64,
}

/// The state change an accepted command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    CursorMoved(usize),
    StonePlaced(Move),
    Passed { next: Color },
    BoardReset,
    Quit,
}

impl Applied {
    /// Whether other viewers need to redraw
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Applied::Quit)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub board_size: usize,
    /// Practice sessions allow clearing the board mid-game
    pub practice: bool,
    pub notify_depth: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            practice: false,
            notify_depth: DEFAULT_NOTIFY_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
struct Seat {
    id: PlayerId,
    name: String,
}

#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    board: Board,
    cursor: Option<usize>,
    last: Option<usize>,
    turn: Color,
    black: Option<Seat>,
    white: Option<Seat>,
    spectators: Vec<PlayerId>,
    history: Vec<Move>,
    passes: u32,
    practice: bool,
    notify_depth: usize,
    subscribers: Vec<Subscriber>,
    next_player_id: PlayerId,
    created_at: u64,
}

impl GameSession {
    pub fn new(id: impl Into<SessionId>, options: &SessionOptions) -> Self {
        let id = id.into();
        info!(
            "Creating session {} ({}x{}{})",
            id,
            options.board_size,
            options.board_size,
            if options.practice { ", practice" } else { "" }
        );

        Self {
            id,
            board: Board::new(options.board_size),
            cursor: None,
            last: None,
            turn: Color::Black,
            black: None,
            white: None,
            spectators: Vec::new(),
            history: Vec::new(),
            passes: 0,
            practice: options.practice,
            notify_depth: options.notify_depth,
            subscribers: Vec::new(),
            next_player_id: 0,
            created_at: get_timestamp(),
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn last(&self) -> Option<usize> {
        self.last
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn is_practice(&self) -> bool {
        self.practice
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Number of occupied seats (0, 1 or 2)
    pub fn player_count(&self) -> usize {
        usize::from(self.black.is_some()) + usize::from(self.white.is_some())
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Point-in-time copy of the move history
    pub fn history(&self) -> Vec<Move> {
        self.history.clone()
    }

    /// Binds a new connection. Seats are handed out Black then White;
    /// once both are taken the connection is admitted as a spectator.
    pub fn bind(&mut self, name: impl Into<String>) -> PlayerHandle {
        let name = name.into();
        let id = self.next_player_id;
        self.next_player_id += 1;

        let role = if self.black.is_none() {
            self.black = Some(Seat {
                id,
                name: name.clone(),
            });
            Role::Player(Color::Black)
        } else if self.white.is_none() {
            self.white = Some(Seat {
                id,
                name: name.clone(),
            });
            Role::Player(Color::White)
        } else {
            self.spectators.push(id);
            Role::Spectator
        };

        let (sender, receiver) = notification_channel(self.notify_depth);
        self.subscribers.push(Subscriber { id, sender });

        info!(
            "Session {}: {} bound as player {} ({:?})",
            self.id, name, id, role
        );
        PlayerHandle::new(self.id.clone(), id, role, name, receiver)
    }

    /// Releases a connection's seat and notification queue. Returns false
    /// if the player was not bound.
    pub fn unbind(&mut self, player_id: PlayerId) -> bool {
        let mut found = false;

        if self.black.as_ref().map(|s| s.id) == Some(player_id) {
            self.black = None;
            found = true;
        } else if self.white.as_ref().map(|s| s.id) == Some(player_id) {
            self.white = None;
            found = true;
        } else if let Some(pos) = self.spectators.iter().position(|id| *id == player_id) {
            self.spectators.remove(pos);
            found = true;
        }

        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != player_id);
        found |= self.subscribers.len() != before;

        if found {
            info!("Session {}: player {} unbound", self.id, player_id);
        }
        found
    }

    pub fn role_of(&self, player_id: PlayerId) -> Option<Role> {
        if self.black.as_ref().map(|s| s.id) == Some(player_id) {
            Some(Role::Player(Color::Black))
        } else if self.white.as_ref().map(|s| s.id) == Some(player_id) {
            Some(Role::Player(Color::White))
        } else if self.spectators.contains(&player_id) {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    /// The color a player may write as, if any
    pub fn authority(&self, player_id: PlayerId) -> Option<Color> {
        self.role_of(player_id).and_then(Role::color)
    }

    fn seated(&self, player_id: PlayerId) -> Result<Color, Rejected> {
        match self.role_of(player_id) {
            Some(Role::Player(color)) => Ok(color),
            Some(Role::Spectator) => Err(Rejected::Spectator),
            None => Err(Rejected::UnknownPlayer(player_id)),
        }
    }

    fn require_turn(&self, player_id: PlayerId) -> Result<Color, Rejected> {
        let color = self.seated(player_id)?;
        if color != self.turn {
            return Err(Rejected::NotYourTurn {
                expected: self.turn,
            });
        }
        Ok(color)
    }

    fn centre(&self) -> Option<usize> {
        let mid = self.board.size() / 2;
        self.board.index(mid, mid)
    }

    /// Moves the shared cursor one point. The first motion of a game puts
    /// the cursor on the centre point; motions off the edge are rejected.
    pub fn move_cursor(
        &mut self,
        player_id: PlayerId,
        direction: Direction,
    ) -> Result<usize, Rejected> {
        self.require_turn(player_id)?;

        let target = match self.cursor.and_then(|i| self.board.coords(i)) {
            None => self.centre(),
            Some((row, col)) => match direction {
                Direction::Up => row.checked_sub(1).and_then(|r| self.board.index(r, col)),
                Direction::Down => self.board.index(row + 1, col),
                Direction::Left => col.checked_sub(1).and_then(|c| self.board.index(row, c)),
                Direction::Right => self.board.index(row, col + 1),
            },
        }
        .ok_or(Rejected::OffBoard)?;

        self.cursor = Some(target);
        Ok(target)
    }

    /// Places the current player's stone under the cursor and hands the
    /// turn to the other color.
    pub fn place_stone(&mut self, player_id: PlayerId) -> Result<Move, Rejected> {
        let color = self.require_turn(player_id)?;
        let index = self.cursor.ok_or(Rejected::NoCursor)?;
        let (row, col) = self.board.coords(index).ok_or(Rejected::OffBoard)?;

        if self.board.at(index) != Some(Cell::Empty) {
            return Err(Rejected::Occupied { row, col });
        }

        self.board.set(row, col, color.into());
        let mv = Move {
            turn: self.history.len() as u32,
            player: color,
            row,
            col,
            timestamp: get_timestamp(),
        };
        self.history.push(mv.clone());
        self.last = Some(index);
        self.turn = color.opposite();

        info!(
            "Session {}: move {} {} at {}",
            self.id,
            mv.turn,
            color,
            self.board.point_name(index).unwrap_or_default()
        );
        Ok(mv)
    }

    /// Gives the turn away without touching the board
    pub fn pass(&mut self, player_id: PlayerId) -> Result<Color, Rejected> {
        let color = self.require_turn(player_id)?;
        self.passes += 1;
        self.turn = color.opposite();
        info!("Session {}: {} passes", self.id, color);
        Ok(self.turn)
    }

    /// Starts the game over on an empty board; practice sessions only
    pub fn reset_board(&mut self, player_id: PlayerId) -> Result<(), Rejected> {
        if !self.practice {
            return Err(Rejected::NotPractice);
        }
        self.seated(player_id)?;

        self.board.clear();
        self.cursor = None;
        self.last = None;
        self.history.clear();
        self.passes = 0;
        self.turn = Color::Black;
        info!("Session {}: board reset by player {}", self.id, player_id);
        Ok(())
    }

    pub fn apply(&mut self, player_id: PlayerId, command: Command) -> Result<Applied, Rejected> {
        let applied = match command {
            Command::MoveCursor(direction) => {
                Applied::CursorMoved(self.move_cursor(player_id, direction)?)
            }
            Command::PlaceStone => Applied::StonePlaced(self.place_stone(player_id)?),
            Command::Pass => Applied::Passed {
                next: self.pass(player_id)?,
            },
            Command::Reset => {
                self.reset_board(player_id)?;
                Applied::BoardReset
            }
            Command::Quit => Applied::Quit,
        };

        debug!(
            "Session {}: player {} applied {:?}",
            self.id, player_id, applied
        );
        Ok(applied)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            board: self.board.clone(),
            cursor: self.cursor,
            last: self.last,
            turn: self.turn,
            moves: self.history.len() as u32,
            passes: self.passes,
            black: self.black.as_ref().map(|s| s.name.clone()),
            white: self.white.as_ref().map(|s| s.name.clone()),
            spectators: self.spectators.len() as u32,
        }
    }

    /// Summary record for the archive
    pub fn summary(&self, ended_at: u64) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            board_size: self.board.size(),
            black: self.black.as_ref().map(|s| s.name.clone()),
            white: self.white.as_ref().map(|s| s.name.clone()),
            created_at: self.created_at,
            // Captures are not tracked; the engine does not apply Go rules.
            black_captures: 0,
            white_captures: 0,
            ended_at,
        }
    }

    pub(crate) fn subscribers_mut(&mut self) -> &mut Vec<Subscriber> {
        &mut self.subscribers
    }
}
