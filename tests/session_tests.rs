//! Cross-component tests for sessions, dispatch and the registry
//!
//! These drive the server library directly, without sockets, to check the
//! guarantees that hold under concurrent access.

use rand::seq::SliceRandom;
use rand::Rng;
use server::archive::{ArchiveLine, JsonLinesArchive};
use server::error::Rejected;
use server::registry::SessionRegistry;
use server::session::{Applied, SessionOptions};
use shared::{Cell, Color, Command, Direction, Role};
use std::collections::HashSet;

/// TURN AND HISTORY PROPERTIES
mod property_tests {
    use super::*;

    const DIRECTIONS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Random command streams from both seats and a spectator never break
    /// the turn order or the history bookkeeping.
    #[tokio::test]
    async fn random_play_keeps_invariants() {
        let registry = SessionRegistry::new();
        let entry = registry
            .get_or_create("random", &SessionOptions::default())
            .await
            .unwrap();

        let (black, white, spectator) = {
            let mut session = entry.session.write().await;
            (session.bind("a"), session.bind("b"), session.bind("c"))
        };
        let ids = [black.id(), white.id(), spectator.id()];
        let mut rng = rand::thread_rng();

        for _ in 0..2_000 {
            let player = *ids.choose(&mut rng).unwrap();
            let command = match rng.gen_range(0..10) {
                0..=5 => Command::MoveCursor(*DIRECTIONS.choose(&mut rng).unwrap()),
                6..=8 => Command::PlaceStone,
                _ => Command::Pass,
            };

            let mut session = entry.session.write().await;
            let turn_before = session.turn();
            let moves_before = session.move_count();
            let board_before = session.board().clone();

            match session.apply(player, command) {
                Ok(Applied::StonePlaced(mv)) => {
                    assert_eq!(mv.player, turn_before);
                    assert_eq!(mv.turn as usize, moves_before);
                    assert_eq!(board_before.get(mv.row, mv.col), Some(Cell::Empty));
                    assert_eq!(session.board().get(mv.row, mv.col), Some(mv.player.into()));
                    assert_eq!(session.turn(), turn_before.opposite());
                }
                Ok(Applied::Passed { next }) => {
                    assert_eq!(next, turn_before.opposite());
                    assert_eq!(session.move_count(), moves_before);
                }
                Ok(Applied::CursorMoved(index)) => {
                    assert!(index < session.board().len());
                    assert_eq!(session.turn(), turn_before);
                }
                Ok(other) => panic!("Unexpected outcome {:?}", other),
                Err(_) => {
                    assert_eq!(session.turn(), turn_before);
                    assert_eq!(session.move_count(), moves_before);
                    assert_eq!(session.board(), &board_before);
                }
            }

            assert_ne!(session.role_of(spectator.id()), None);
            assert_eq!(session.authority(spectator.id()), None);
        }

        let session = entry.session.read().await;
        let history = session.history();

        // Turn numbers are dense and every stone on the board is in history.
        for (i, mv) in history.iter().enumerate() {
            assert_eq!(mv.turn as usize, i);
        }
        let black_stones = history.iter().filter(|m| m.player == Color::Black).count();
        let white_stones = history.len() - black_stones;
        assert_eq!(session.board().count(Cell::Black), black_stones);
        assert_eq!(session.board().count(Cell::White), white_stones);

        let points: HashSet<(usize, usize)> = history.iter().map(|m| (m.row, m.col)).collect();
        assert_eq!(points.len(), history.len());
    }

    #[tokio::test]
    async fn racing_placements_produce_one_stone() {
        let registry = SessionRegistry::new();
        let entry = registry
            .get_or_create("race", &SessionOptions::default())
            .await
            .unwrap();

        let black = {
            let mut session = entry.session.write().await;
            let black = session.bind("a");
            session.bind("b");
            session.move_cursor(black.id(), Direction::Up).unwrap();
            black
        };

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let session = entry.session.clone();
            let id = black.id();
            tasks.push(tokio::spawn(async move {
                session.write().await.apply(id, Command::PlaceStone)
            }));
        }

        let mut placed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(Applied::StonePlaced(_)) => placed += 1,
                Err(Rejected::NotYourTurn { expected }) => assert_eq!(expected, Color::White),
                other => panic!("Unexpected outcome {:?}", other),
            }
        }

        assert_eq!(placed, 1);
        assert_eq!(entry.session.read().await.move_count(), 1);
    }
}

/// NOTIFICATION TESTS
mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn every_viewer_but_the_mover_is_notified() {
        let registry = SessionRegistry::new();
        let entry = registry
            .get_or_create("1", &SessionOptions::default())
            .await
            .unwrap();

        let (black, mut white, mut watchers) = {
            let mut session = entry.session.write().await;
            let black = session.bind("a");
            let white = session.bind("b");
            let watchers: Vec<_> = (0..5).map(|i| session.bind(format!("w{}", i))).collect();
            (black, white, watchers)
        };
        assert!(watchers.iter().all(|w| w.role() == Role::Spectator));

        entry
            .session
            .write()
            .await
            .apply(black.id(), Command::MoveCursor(Direction::Up))
            .unwrap();
        let report = entry.dispatcher.publish(black.id()).await.unwrap();
        assert_eq!(report.delivered, 6);

        let mut black = black;
        assert!(black.try_notified().is_none());
        assert_eq!(white.try_notified().map(|n| n.origin), Some(black.id()));
        for watcher in watchers.iter_mut() {
            assert!(watcher.try_notified().is_some());
        }
    }

    #[tokio::test]
    async fn slow_viewer_gets_one_coalesced_notification() {
        let registry = SessionRegistry::new();
        let entry = registry
            .get_or_create("1", &SessionOptions::default())
            .await
            .unwrap();

        let (black, mut white) = {
            let mut session = entry.session.write().await;
            (session.bind("a"), session.bind("b"))
        };

        for direction in [Direction::Up, Direction::Left, Direction::Left] {
            entry
                .session
                .write()
                .await
                .move_cursor(black.id(), direction)
                .unwrap();
            entry.dispatcher.publish(black.id()).await.unwrap();
        }

        assert!(white.try_notified().is_some());
        assert!(white.try_notified().is_none());
        // The one notification still leads to the latest state.
        assert_eq!(entry.session.read().await.cursor(), Some(38));
    }

    #[tokio::test]
    async fn dropped_handle_is_pruned_and_its_seat_reused() {
        let registry = SessionRegistry::new();
        let entry = registry
            .get_or_create("1", &SessionOptions::default())
            .await
            .unwrap();

        let (black, white, watcher) = {
            let mut session = entry.session.write().await;
            (session.bind("a"), session.bind("b"), session.bind("c"))
        };
        let white_id = white.id();
        drop(white);
        drop(watcher);

        let report = entry.dispatcher.publish(black.id()).await.unwrap();
        assert_eq!(report.pruned, 2);

        let mut session = entry.session.write().await;
        assert_eq!(session.subscriber_count(), 1);
        assert_eq!(session.player_count(), 1);
        assert_eq!(session.spectator_count(), 0);
        assert_eq!(session.view().spectators, 0);
        // Already released, so a late unbind finds nothing.
        assert!(!session.unbind(white_id));

        let next = session.bind("d");
        assert_eq!(next.role(), Role::Player(Color::White));
    }
}

/// ARCHIVE TESTS
mod archive_tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_archive_writes_played_games() {
        let path = std::env::temp_dir().join(format!(
            "go-session-tests-{}.jsonl",
            rand::thread_rng().gen::<u64>()
        ));
        let archive = JsonLinesArchive::new(&path);
        let registry = SessionRegistry::new();

        let entry = registry
            .get_or_create("played", &SessionOptions::default())
            .await
            .unwrap();
        registry
            .get_or_create("idle", &SessionOptions::default())
            .await
            .unwrap();

        {
            let mut session = entry.session.write().await;
            let black = session.bind("alice");
            let white = session.bind("bob");
            session.move_cursor(black.id(), Direction::Up).unwrap();
            session.place_stone(black.id()).unwrap();
            session.move_cursor(white.id(), Direction::Down).unwrap();
            session.place_stone(white.id()).unwrap();
        }

        assert_eq!(registry.archive_all(&archive).await, 1);
        // Archiving never touches the live game.
        assert_eq!(entry.session.read().await.move_count(), 2);

        let contents = std::fs::read_to_string(archive.path()).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<ArchiveLine> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        match &lines[0] {
            ArchiveLine::Game(summary) => {
                assert_eq!(summary.id, "played");
                assert_eq!(summary.black.as_deref(), Some("alice"));
                assert_eq!(summary.white.as_deref(), Some("bob"));
            }
            other => panic!("Expected game line, got {:?}", other),
        }
        match &lines[2] {
            ArchiveLine::Move(record) => {
                assert_eq!(record.player, Color::White);
                assert_eq!((record.row, record.col), (5, 4));
            }
            other => panic!("Expected move line, got {:?}", other),
        }
    }
}
