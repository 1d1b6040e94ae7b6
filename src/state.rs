//! The game position: each player's pieces and the side to move

use anyhow::{anyhow, bail, Result};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{point::Point, BOARD_SIZE, PIECES_PER_PLAYER};

/// One of the two players
///
/// Player one plays the white pieces (`O`) and moves first, player two plays
/// the black pieces (`X`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// The value this player's pieces take on a `Drawboard`
    pub fn cell(self) -> i8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Player::One => 'O',
            Player::Two => 'X',
        }
    }

    pub fn colour(self) -> &'static str {
        match self {
            Player::One => "white",
            Player::Two => "black",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "player 1"),
            Player::Two => write!(f, "player 2"),
        }
    }
}

/// A complete game position
///
/// Only the piece locations are stored. Both piece lists are kept sorted in
/// ascending `Point` order, which move generation and the terminal test rely
/// on to only look forward from each piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct State {
    pub is_player_one: bool,
    pub white_pieces: [Point; PIECES_PER_PLAYER],
    pub black_pieces: [Point; PIECES_PER_PLAYER],
}

impl State {
    /// The standard starting position, player 1 to move
    pub const fn new() -> Self {
        Self {
            is_player_one: true,
            white_pieces: [
                Point::new(0, 2),
                Point::new(0, 4),
                Point::new(0, 6),
                Point::new(6, 1),
                Point::new(6, 3),
                Point::new(6, 5),
            ],
            black_pieces: [
                Point::new(0, 1),
                Point::new(0, 3),
                Point::new(0, 5),
                Point::new(6, 0),
                Point::new(6, 2),
                Point::new(6, 4),
            ],
        }
    }

    /// Builds a position from arbitrary piece lists, validating and sorting them
    pub fn from_pieces(white: &[Point], black: &[Point], is_player_one: bool) -> Result<Self> {
        if white.len() != PIECES_PER_PLAYER || black.len() != PIECES_PER_PLAYER {
            bail!(
                "invalid position, expected {} pieces per player but found {} white and {} black",
                PIECES_PER_PLAYER,
                white.len(),
                black.len()
            );
        }

        let mut occupied = [[false; BOARD_SIZE]; BOARD_SIZE];
        for piece in white.iter().chain(black.iter()) {
            if piece.x() >= BOARD_SIZE || piece.y() >= BOARD_SIZE {
                bail!("invalid position, piece {:?} is off the board", piece);
            }
            if occupied[piece.x()][piece.y()] {
                bail!("invalid position, two pieces on {:?}", piece);
            }
            occupied[piece.x()][piece.y()] = true;
        }

        let mut state = Self {
            is_player_one,
            white_pieces: [Point::default(); PIECES_PER_PLAYER],
            black_pieces: [Point::default(); PIECES_PER_PLAYER],
        };
        state.white_pieces.copy_from_slice(white);
        state.black_pieces.copy_from_slice(black);
        state.white_pieces.sort_unstable();
        state.black_pieces.sort_unstable();
        Ok(state)
    }

    /// Parses a text grid, `O` for player 1, `X` for player 2 and a space for an empty cell
    ///
    /// Newlines end a row and every other character is ignored, so the
    /// comma-separated grid written by [`State::to_grid`] parses back. The
    /// parsed position has player 1 to move.
    pub fn parse(text: &str) -> Result<Self> {
        let mut white = Vec::with_capacity(PIECES_PER_PLAYER);
        let mut black = Vec::with_capacity(PIECES_PER_PLAYER);

        let (mut x, mut y) = (0, 0);
        for ch in text.chars() {
            if y >= BOARD_SIZE {
                break;
            }
            match ch {
                'O' | 'X' | ' ' => {
                    if x == BOARD_SIZE {
                        bail!("invalid grid, row {} has more than {} cells", y + 1, BOARD_SIZE);
                    }
                    match ch {
                        'O' => white.push(Point::new(x, y)),
                        'X' => black.push(Point::new(x, y)),
                        _ => {}
                    }
                    x += 1;
                }
                '\n' => {
                    x = 0;
                    y += 1;
                }
                _ => {}
            }
        }

        if white.len() != PIECES_PER_PLAYER || black.len() != PIECES_PER_PLAYER {
            return Err(anyhow!(
                "invalid grid, expected {} 'O' and {} 'X' but found {} and {}",
                PIECES_PER_PLAYER,
                PIECES_PER_PLAYER,
                white.len(),
                black.len()
            ));
        }
        Self::from_pieces(&white, &black, true)
    }

    /// Writes the bare grid form read by [`State::parse`]
    pub fn to_grid(&self) -> String {
        let mut grid = String::with_capacity(BOARD_SIZE * 2 * BOARD_SIZE);
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                grid.push(self.symbol_at(Point::new(x, y)));
                if x + 1 < BOARD_SIZE {
                    grid.push(',');
                }
            }
            grid.push('\n');
        }
        grid
    }

    pub fn to_move(&self) -> Player {
        if self.is_player_one {
            Player::One
        } else {
            Player::Two
        }
    }

    pub fn pieces(&self, player: Player) -> &[Point; PIECES_PER_PLAYER] {
        match player {
            Player::One => &self.white_pieces,
            Player::Two => &self.black_pieces,
        }
    }

    pub fn pieces_mut(&mut self, player: Player) -> &mut [Point; PIECES_PER_PLAYER] {
        match player {
            Player::One => &mut self.white_pieces,
            Player::Two => &mut self.black_pieces,
        }
    }

    /// The owner of the piece on `point`, if any
    pub fn owner(&self, point: Point) -> Option<Player> {
        if self.white_pieces.binary_search(&point).is_ok() {
            Some(Player::One)
        } else if self.black_pieces.binary_search(&point).is_ok() {
            Some(Player::Two)
        } else {
            None
        }
    }

    fn symbol_at(&self, point: Point) -> char {
        self.owner(point).map_or(' ', Player::symbol)
    }

    /// The packed byte representation: one byte per piece followed by the side to move
    pub fn bytes(&self) -> [u8; 2 * PIECES_PER_PLAYER + 1] {
        let mut bytes = [0; 2 * PIECES_PER_PLAYER + 1];
        for (i, piece) in self.white_pieces.iter().chain(self.black_pieces.iter()).enumerate() {
            bytes[i] = piece.byte();
        }
        bytes[2 * PIECES_PER_PLAYER] = self.is_player_one as u8;
        bytes
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Hash for State {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        hasher.write(&self.bytes());
    }
}

impl FromStr for State {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " ")?;
        for x in 0..BOARD_SIZE {
            write!(f, " {}", x + 1)?;
        }
        writeln!(f)?;
        for y in 0..BOARD_SIZE {
            write!(f, "{} ", y + 1)?;
            for x in 0..BOARD_SIZE {
                write!(f, "{}", self.symbol_at(Point::new(x, y)))?;
                if x + 1 < BOARD_SIZE {
                    write!(f, ",")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grid_round_trip() -> Result<()> {
        let state = State::new();
        let parsed = State::parse(&state.to_grid())?;
        assert_eq!(parsed, state);
        Ok(())
    }

    #[test]
    fn rejects_wrong_piece_counts() {
        let grid = " ,O,O,O,O,O,O\n ,X,X,X,X,X, \n";
        assert!(State::parse(grid).is_err());
        assert!(State::parse("OOOOOOOX\n").is_err());
    }

    #[test]
    fn hash_and_order_follow_equality() {
        use std::collections::{BTreeSet, HashSet};

        let mut flipped = State::new();
        flipped.is_player_one = false;

        let hashed: HashSet<State> = vec![State::new(), State::new(), flipped].into_iter().collect();
        let ordered: BTreeSet<State> = hashed.iter().copied().collect();
        assert_eq!(hashed.len(), 2);
        assert_eq!(ordered.iter().next(), Some(&flipped));
    }
}
