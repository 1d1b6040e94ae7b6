//! The rules of Dynamic Connect 4
//!
//! Each player moves one of their six pieces one cell east, west, north or
//! south into an empty cell. The first player to line up four pieces in a
//! row, column, diagonal or anti-diagonal wins.

use anyhow::{anyhow, bail, Result};

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::{
    drawboard::{Drawboard, EMPTY},
    point::Point,
    state::{Player, State},
    BOARD_SIZE,
};

/// Evaluation of a position, positive values favour player 1
pub type Eval = f32;

/// The utility of a position won by player 1
pub const WIN_PLAYER_ONE: Eval = Eval::MAX;
/// The utility of a position won by player 2
pub const WIN_PLAYER_TWO: Eval = Eval::MIN;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    East,
    West,
    South,
    North,
}

impl Direction {
    /// All directions in move generation order
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
    ];

    /// The `(dx, dy)` step of this direction, south is increasing y
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
            Direction::North => (0, -1),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::East => 'E',
            Direction::West => 'W',
            Direction::South => 'S',
            Direction::North => 'N',
        }
    }
}

/// Moves the piece on `from` one step in `direction`
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Action {
    pub from: Point,
    pub direction: Direction,
}

impl Action {
    pub fn new(from: Point, direction: Direction) -> Self {
        Self { from, direction }
    }

    /// The cell the piece lands on, `None` if the step leaves the board
    pub fn destination(&self) -> Option<Point> {
        let (dx, dy) = self.direction.delta();
        self.from
            .offset(dx, dy)
            .filter(|p| p.x() < BOARD_SIZE && p.y() < BOARD_SIZE)
    }
}

/// Actions are written as a 1-based column and row followed by a direction, e.g. `52E`
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.from.x() + 1,
            self.from.y() + 1,
            self.direction.letter()
        )
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.len() != 3 {
            bail!("could not parse '{}' as an action, expected e.g. '52E'", text.trim());
        }

        let coordinate = |ch: char| match ch.to_digit(10).map(|d| d as usize) {
            Some(d @ 1..=BOARD_SIZE) => Ok(d - 1),
            _ => Err(anyhow!(
                "invalid coordinate '{}', coordinates must be between 1 and {}",
                ch,
                BOARD_SIZE
            )),
        };
        let x = coordinate(chars[0])?;
        let y = coordinate(chars[1])?;

        let direction = match chars[2].to_ascii_uppercase() {
            'E' => Direction::East,
            'W' => Direction::West,
            'S' => Direction::South,
            'N' => Direction::North,
            other => bail!("invalid direction '{}', expected one of E, W, S, N", other),
        };
        Ok(Action::new(Point::new(x, y), direction))
    }
}

/// The rules engine
#[derive(Copy, Clone, Debug, Default)]
pub struct Game;

impl Game {
    pub fn new() -> Self {
        Self
    }

    /// All legal actions for the player to move
    pub fn actions(&self, state: &State) -> Vec<Action> {
        let board = Drawboard::new(state);

        let mut actions = Vec::with_capacity(16);
        for &piece in state.pieces(state.to_move()).iter() {
            for &direction in Direction::ALL.iter() {
                let (dx, dy) = direction.delta();
                if board.get(piece.x() as i32 + dx, piece.y() as i32 + dy) == EMPTY {
                    actions.push(Action::new(piece, direction));
                }
            }
        }
        actions
    }

    /// The position after `action` is played; `state` itself is left untouched
    pub fn result(&self, state: &State, action: Action) -> State {
        let mut next = *state;
        let pieces = next.pieces_mut(state.to_move());
        match (pieces.binary_search(&action.from), action.destination()) {
            (Ok(index), Some(destination)) => pieces[index] = destination,
            _ => debug_assert!(false, "no legal move for action {}", action),
        }
        // move generation and the terminal test rely on sorted pieces
        pieces.sort_unstable();
        next.is_player_one = !next.is_player_one;
        next
    }

    /// Whether the player who just moved has four in a line
    pub fn is_terminal(&self, state: &State) -> bool {
        let player = state.to_move().other();
        let board = Drawboard::new(state);

        // sorted pieces mean we only need to look forward along each line
        state.pieces(player).iter().any(|piece| {
            let (x, y) = (piece.x() as i32, piece.y() as i32);
            [(1, -1), (1, 0), (1, 1), (0, 1)]
                .iter()
                .any(|&(dx, dy)| (1..4).all(|i| board.is(x + i * dx, y + i * dy, player)))
        })
    }

    /// The utility of a terminal position
    ///
    /// # Panics
    /// In debug builds, if `state` is not terminal. The value is meaningless
    /// for non-terminal positions.
    pub fn utility(&self, state: &State) -> Eval {
        debug_assert!(
            self.is_terminal(state),
            "utility requested for a non-terminal position"
        );
        // the winner is the player who just moved
        if state.is_player_one {
            WIN_PLAYER_TWO
        } else {
            WIN_PLAYER_ONE
        }
    }

    /// The winner of the position, if it is terminal
    pub fn winner(&self, state: &State) -> Option<Player> {
        if self.is_terminal(state) {
            Some(state.to_move().other())
        } else {
            None
        }
    }

    /// Parses an action and checks it is legal in `state`
    pub fn parse_legal_action(&self, state: &State, text: &str) -> Result<Action> {
        let action: Action = text.parse()?;
        if !self.actions(state).contains(&action) {
            bail!("invalid move {}, not a legal action for {}", action, state.to_move());
        }
        Ok(action)
    }
}

/// Number of consecutive repeated positions that draws the game
pub const REPETITION_LIMIT: usize = 5;
/// Plies between a position and its repetition
pub const REPETITION_DISTANCE: usize = 4;

/// Detects draws by repetition
///
/// A position is a repeat when it equals the position four plies earlier,
/// i.e. both players have shuffled a piece back and forth. Five repeats in a
/// row draw the game.
#[derive(Clone, Debug, Default)]
pub struct RepetitionTracker {
    history: VecDeque<State>,
    repeats: usize,
}

impl RepetitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the position reached after a ply
    pub fn push(&mut self, state: State) {
        let repeated = self.history.len() == REPETITION_DISTANCE
            && self.history.front() == Some(&state);
        self.repeats = if repeated { self.repeats + 1 } else { 0 };

        if self.history.len() == REPETITION_DISTANCE {
            self.history.pop_front();
        }
        self.history.push_back(state);
    }

    pub fn repeats(&self) -> usize {
        self.repeats
    }

    pub fn is_draw(&self) -> bool {
        self.repeats >= REPETITION_LIMIT
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn action_text_form() -> Result<()> {
        let action: Action = "52E".parse()?;
        assert_eq!(action, Action::new(Point::new(4, 1), Direction::East));
        assert_eq!(action.to_string(), "52E");
        assert_eq!(" 17n\n".parse::<Action>()?.direction, Direction::North);

        assert!("82E".parse::<Action>().is_err());
        assert!("50E".parse::<Action>().is_err());
        assert!("52Q".parse::<Action>().is_err());
        assert!("52".parse::<Action>().is_err());
        Ok(())
    }

    #[test]
    fn destination_stays_on_board() -> Result<()> {
        assert_eq!("52E".parse::<Action>()?.destination(), Some(Point::new(5, 1)));
        assert_eq!("11W".parse::<Action>()?.destination(), None);
        assert_eq!("11N".parse::<Action>()?.destination(), None);
        assert_eq!("77E".parse::<Action>()?.destination(), None);
        assert_eq!("77S".parse::<Action>()?.destination(), None);
        Ok(())
    }

    #[test]
    fn rejects_illegal_actions() -> Result<()> {
        let game = Game::new();
        let state = State::new();
        assert!(game.parse_legal_action(&state, "13E").is_ok());
        // blocked by a black piece
        assert!(game.parse_legal_action(&state, "13N").is_err());
        // not player 1's piece
        assert!(game.parse_legal_action(&state, "12E").is_err());
        Ok(())
    }

    #[test]
    fn vertical_four_is_terminal() -> Result<()> {
        let game = Game::new();
        let state = State::parse(
            "   O   \n   O   \n   O   \n   O   \nXXX    \n    OOX\n     XX\n",
        )?;
        // parsed states have player 1 to move, so player 2 just moved
        assert!(!game.is_terminal(&state));

        let mut after_white = state;
        after_white.is_player_one = false;
        assert!(game.is_terminal(&after_white));
        assert_eq!(game.utility(&after_white), WIN_PLAYER_ONE);
        assert_eq!(game.winner(&after_white), Some(Player::One));
        Ok(())
    }
}
