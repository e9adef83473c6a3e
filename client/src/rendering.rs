//! Text rendering of a session snapshot and terminal setup

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color as TermColor, Stylize};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use shared::{Cell, Color, Role, SessionView};
use std::io::{self, Write};

const BOARD_BG: TermColor = TermColor::Rgb {
    r: 0xaf,
    g: 0x87,
    b: 0x5f,
};

pub struct Renderer {
    styled: bool,
}

impl Renderer {
    /// `styled` enables colours; the plain variant only uses glyphs and is
    /// what tests and dumb terminals see.
    pub fn new(styled: bool) -> Self {
        Renderer { styled }
    }

    pub fn is_styled(&self) -> bool {
        self.styled
    }

    /// Renders the board, margins and status lines, one line per `\n`
    pub fn render(&self, view: &SessionView, role: Role) -> String {
        let board = &view.board;
        let size = board.size();
        let cursor = view.cursor.and_then(|i| board.coords(i));

        let mut lines = Vec::with_capacity(size + 6);
        lines.push(self.column_margin(size, cursor.map(|(_, c)| c)));

        for row in 0..size {
            let selected = cursor.map(|(r, _)| r) == Some(row);
            let label = self.margin(&format!("{:>2}", row + 1), selected);
            let mut line = format!("{} ", label);

            for col in 0..size {
                let index = row * size + col;
                let cell = board.at(index).unwrap_or_default();
                let is_cursor = view.cursor == Some(index);
                let is_last = view.last == Some(index);
                line.push_str(&self.point(cell, is_cursor, is_last, view.turn));
                if col + 1 < size {
                    line.push_str(&self.spacer());
                }
            }

            line.push(' ');
            line.push_str(&self.margin(&(row + 1).to_string(), selected));
            lines.push(line);
        }

        lines.push(self.column_margin(size, cursor.map(|(_, c)| c)));
        lines.push(String::new());
        lines.extend(status_lines(view, role));
        lines.join("\n")
    }

    fn column_margin(&self, size: usize, selected: Option<usize>) -> String {
        let mut line = "   ".to_string();
        for col in 0..size {
            let letter = ((b'A' + (col % 26) as u8) as char).to_string();
            line.push_str(&self.margin(&letter, selected == Some(col)));
            line.push(' ');
        }
        line.trim_end().to_string()
    }

    fn margin(&self, text: &str, selected: bool) -> String {
        if self.styled && selected {
            format!("{}", text.with(TermColor::Red).bold())
        } else {
            text.to_string()
        }
    }

    fn spacer(&self) -> String {
        if self.styled {
            format!("{}", "─".with(TermColor::Black).on(BOARD_BG))
        } else {
            " ".to_string()
        }
    }

    /// The cursor is a ring in the colour of the side to move and the last
    /// stone a ring in its owner's colour; the cursor wins where they meet.
    fn point(&self, cell: Cell, cursor: bool, last: bool, turn: Color) -> String {
        let marker = if cursor {
            Some(turn)
        } else if last {
            owner(cell)
        } else {
            None
        };

        if !self.styled {
            let glyph = match (marker, cell) {
                (Some(_), _) => MARKER,
                (None, Cell::Black) => "●",
                (None, Cell::White) => "◇",
                (None, Cell::Empty) => "┼",
            };
            return glyph.to_string();
        }

        let styled = match (marker, cell) {
            (Some(color), _) => MARKER.with(stone_colour(color)),
            (None, Cell::Black) => "●".with(TermColor::Black),
            (None, Cell::White) => "●".with(TermColor::White),
            (None, Cell::Empty) => "┼".with(TermColor::Black),
        };
        format!("{}", styled.on(BOARD_BG))
    }
}

const MARKER: &str = "○";

fn owner(cell: Cell) -> Option<Color> {
    match cell {
        Cell::Black => Some(Color::Black),
        Cell::White => Some(Color::White),
        Cell::Empty => None,
    }
}

fn stone_colour(color: Color) -> TermColor {
    match color {
        Color::Black => TermColor::Black,
        Color::White => TermColor::White,
    }
}

fn seat(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("(open)")
}

fn status_lines(view: &SessionView, role: Role) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!(
        "Session {}  Black: {}  White: {}  Spectators: {}",
        view.session_id,
        seat(&view.black),
        seat(&view.white),
        view.spectators
    ));

    let to_move = match role {
        Role::Player(color) if color == view.turn => format!("Turn: {} (you)", view.turn),
        _ => format!("Turn: {}", view.turn),
    };
    lines.push(format!(
        "{}  Moves: {}  Passes: {}",
        to_move, view.moves, view.passes
    ));

    let last = view
        .last
        .and_then(|i| view.board.point_name(i))
        .unwrap_or_else(|| "-".to_string());
    let you = match role {
        Role::Player(color) => format!("You play {}", color),
        Role::Spectator => "You are watching".to_string(),
    };
    lines.push(format!("Last move: {}  {}", last, you));
    lines
}

/// Puts the terminal into raw mode on an alternate screen and restores it
/// when dropped, including on early returns and panics unwinding through.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(TerminalGuard { _private: () })
    }

    /// Replaces the screen contents with `frame`
    pub fn draw(&self, frame: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
        // Raw mode does not translate \n into a carriage return.
        stdout.write_all(frame.replace('\n', "\r\n").as_bytes())?;
        stdout.flush()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Board;

    fn view(size: usize) -> SessionView {
        SessionView {
            session_id: "1".to_string(),
            board: Board::new(size),
            cursor: None,
            last: None,
            turn: Color::Black,
            moves: 0,
            passes: 0,
            black: Some("alice".to_string()),
            white: None,
            spectators: 0,
        }
    }

    #[test]
    fn test_plain_empty_board() {
        let out = Renderer::new(false).render(&view(3), Role::Spectator);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "   A B C");
        assert_eq!(lines[1], " 1 ┼ ┼ ┼ 1");
        assert_eq!(lines[3], " 3 ┼ ┼ ┼ 3");
        assert_eq!(lines[4], "   A B C");
        assert!(out.contains("Black: alice  White: (open)"));
        assert!(out.contains("You are watching"));
    }

    #[test]
    fn test_plain_stones_and_markers() {
        let mut v = view(3);
        v.board.set(0, 0, Cell::Black);
        v.board.set(0, 2, Cell::White);
        v.board.set(1, 1, Cell::White);
        v.cursor = Some(8);
        v.last = Some(4);
        v.turn = Color::Black;
        v.moves = 3;

        let out = Renderer::new(false).render(&v, Role::Player(Color::Black));
        let lines: Vec<&str> = out.lines().collect();

        // White stones never look like the ring marker.
        assert_eq!(lines[1], " 1 ● ┼ ◇ 1");
        assert_eq!(lines[2], " 2 ┼ ○ ┼ 2");
        assert_eq!(lines[3], " 3 ┼ ┼ ○ 3");
        assert!(out.contains("Turn: Black (you)  Moves: 3  Passes: 0"));
        assert!(out.contains("Last move: B2  You play Black"));
    }

    #[test]
    fn test_plain_cursor_visible_on_a_stone() {
        let mut v = view(3);
        v.board.set(0, 0, Cell::Black);
        v.cursor = Some(0);

        let out = Renderer::new(false).render(&v, Role::Spectator);
        assert_eq!(out.lines().nth(1), Some(" 1 ○ ┼ ┼ 1"));
    }

    #[test]
    fn test_styled_markers_take_their_colour() {
        let renderer = Renderer::new(true);
        let mut v = view(3);
        v.board.set(0, 0, Cell::White);
        v.board.set(2, 2, Cell::Black);
        v.last = Some(8);
        v.cursor = Some(0);
        v.turn = Color::Black;

        let out = renderer.render(&v, Role::Spectator);
        let black_ring = format!("{}", MARKER.with(TermColor::Black).on(BOARD_BG));
        let white_ring = format!("{}", MARKER.with(TermColor::White).on(BOARD_BG));

        // Cursor on the white stone is drawn for Black, the side to move.
        assert_eq!(out.matches(black_ring.as_str()).count(), 2);
        assert!(!out.contains(white_ring.as_str()));

        v.turn = Color::White;
        v.cursor = Some(4);
        let out = renderer.render(&v, Role::Spectator);
        assert_eq!(out.matches(white_ring.as_str()).count(), 1);
        // Last stone keeps its owner's colour.
        assert_eq!(out.matches(black_ring.as_str()).count(), 1);
    }

    #[test]
    fn test_turn_marker_only_for_side_to_move() {
        let out = Renderer::new(false).render(&view(3), Role::Player(Color::White));
        assert!(out.contains("Turn: Black  Moves"));
        assert!(!out.contains("(you)"));
    }

    #[test]
    fn test_styled_output_uses_escape_codes() {
        let renderer = Renderer::new(true);
        assert!(renderer.is_styled());

        let mut v = view(3);
        v.cursor = Some(4);
        let out = renderer.render(&v, Role::Spectator);
        assert!(out.contains('\u{1b}'));
        assert!(out.contains("○"));
        let plain = Renderer::new(false).render(&v, Role::Spectator);
        assert_eq!(out.lines().count(), plain.lines().count());
    }
}
