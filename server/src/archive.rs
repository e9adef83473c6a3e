//! Durable record of finished games
//!
//! Archiving only ever reads a snapshot of a session, so a failed write can
//! not leave the live game half-updated.

use crate::error::ArchiveError;
use crate::session::Move;
use serde::{Deserialize, Serialize};
use shared::Color;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: String,
    pub board_size: usize,
    pub black: Option<String>,
    pub white: Option<String>,
    pub created_at: u64,
    pub black_captures: u32,
    pub white_captures: u32,
    pub ended_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: String,
    pub turn: u32,
    pub player: Color,
    pub row: usize,
    pub col: usize,
    pub timestamp: u64,
}

impl MoveRecord {
    pub fn new(game_id: &str, mv: &Move) -> Self {
        Self {
            game_id: game_id.to_string(),
            turn: mv.turn,
            player: mv.player,
            row: mv.row,
            col: mv.col,
            timestamp: mv.timestamp,
        }
    }
}

/// One line of a JSON-lines archive file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchiveLine {
    Game(GameSummary),
    Move(MoveRecord),
}

pub trait Archive: Send + Sync {
    fn record(&self, summary: &GameSummary, moves: &[Move]) -> Result<(), ArchiveError>;
}

/// Appends each game as one summary line followed by one line per move
#[derive(Debug)]
pub struct JsonLinesArchive {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(summary: &GameSummary, moves: &[Move]) -> Result<String, ArchiveError> {
        let mut out = serde_json::to_string(&ArchiveLine::Game(summary.clone()))?;
        out.push('\n');
        for mv in moves {
            let line = ArchiveLine::Move(MoveRecord::new(&summary.id, mv));
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Archive for JsonLinesArchive {
    fn record(&self, summary: &GameSummary, moves: &[Move]) -> Result<(), ArchiveError> {
        // Encode everything up front so a bad record never leaves a partial game.
        let data = Self::encode(summary, moves)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn temp_path(tag: &str) -> PathBuf {
        let suffix: u64 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("go-archive-{}-{}.jsonl", tag, suffix))
    }

    fn summary() -> GameSummary {
        GameSummary {
            id: "7".to_string(),
            board_size: 9,
            black: Some("alice".to_string()),
            white: Some("bob".to_string()),
            created_at: 100,
            black_captures: 0,
            white_captures: 0,
            ended_at: 200,
        }
    }

    fn moves() -> Vec<Move> {
        vec![
            Move {
                turn: 0,
                player: Color::Black,
                row: 4,
                col: 4,
                timestamp: 110,
            },
            Move {
                turn: 1,
                player: Color::White,
                row: 2,
                col: 6,
                timestamp: 120,
            },
        ]
    }

    #[test]
    fn test_json_lines_layout() {
        let path = temp_path("layout");
        let archive = JsonLinesArchive::new(&path);

        archive.record(&summary(), &moves()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<ArchiveLine> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        std::fs::remove_file(&path).ok();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ArchiveLine::Game(summary()));
        match &lines[2] {
            ArchiveLine::Move(record) => {
                assert_eq!(record.game_id, "7");
                assert_eq!(record.turn, 1);
                assert_eq!(record.player, Color::White);
                assert_eq!((record.row, record.col), (2, 6));
            }
            other => panic!("Unexpected line: {:?}", other),
        }
        assert!(contents.starts_with("{\"kind\":\"game\""));
    }

    #[test]
    fn test_records_append() {
        let path = temp_path("append");
        let archive = JsonLinesArchive::new(&path);

        archive.record(&summary(), &moves()).unwrap();
        archive.record(&summary(), &[]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn test_unwritable_path_reports_io_error() {
        // A directory cannot be opened for appending.
        let archive = JsonLinesArchive::new(std::env::temp_dir());
        assert!(matches!(
            archive.record(&summary(), &moves()),
            Err(ArchiveError::Io(_))
        ));
    }
}
