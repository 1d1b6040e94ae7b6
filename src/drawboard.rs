//! A scratch occupancy grid for O(1) "what is on this cell" queries

use std::cell::{Cell, RefCell};

use crate::{
    state::{Player, State},
    BOARD_SIZE,
};

thread_local! {
    static SCRATCH: RefCell<[[i8; BOARD_SIZE]; BOARD_SIZE]> =
        RefCell::new([[0; BOARD_SIZE]; BOARD_SIZE]);
    static IN_USE: Cell<bool> = Cell::new(false);
}

/// Value of an empty cell
pub const EMPTY: i8 = 0;
/// Value returned for cells outside the board
pub const OFF_BOARD: i8 = -1;

/// A view of a state drawn onto this thread's scratch grid
///
/// Creating a `Drawboard` fills the grid with the state's pieces and dropping
/// it erases them again, so only one may be alive per thread at a time.
pub struct Drawboard<'a> {
    state: &'a State,
}

impl<'a> Drawboard<'a> {
    pub fn new(state: &'a State) -> Self {
        IN_USE.with(|in_use| {
            assert!(!in_use.get(), "a Drawboard is already alive on this thread");
            in_use.set(true);
        });
        SCRATCH.with(|scratch| {
            let mut grid = scratch.borrow_mut();
            for piece in state.white_pieces.iter() {
                grid[piece.x()][piece.y()] = Player::One.cell();
            }
            for piece in state.black_pieces.iter() {
                grid[piece.x()][piece.y()] = Player::Two.cell();
            }
        });
        Self { state }
    }

    /// The content of `(x, y)`: 0 empty, 1 white, 2 black, -1 off the board
    pub fn get(&self, x: i32, y: i32) -> i8 {
        if x < 0 || x >= BOARD_SIZE as i32 || y < 0 || y >= BOARD_SIZE as i32 {
            return OFF_BOARD;
        }
        SCRATCH.with(|scratch| scratch.borrow()[x as usize][y as usize])
    }

    /// Whether `(x, y)` holds a piece of `player`
    pub fn is(&self, x: i32, y: i32, player: Player) -> bool {
        self.get(x, y) == player.cell()
    }
}

impl Drop for Drawboard<'_> {
    fn drop(&mut self) {
        SCRATCH.with(|scratch| {
            let mut grid = scratch.borrow_mut();
            for piece in self.state.white_pieces.iter().chain(self.state.black_pieces.iter()) {
                grid[piece.x()][piece.y()] = EMPTY;
            }
        });
        IN_USE.with(|in_use| in_use.set(false));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn draws_and_erases_state() {
        let state = State::new();
        {
            let board = Drawboard::new(&state);
            assert_eq!(board.get(0, 2), 1);
            assert_eq!(board.get(0, 1), 2);
            assert_eq!(board.get(3, 3), EMPTY);
            assert_eq!(board.get(-1, 3), OFF_BOARD);
            assert_eq!(board.get(3, 7), OFF_BOARD);
        }

        let mut other = State::new();
        other.white_pieces[0] = crate::point::Point::new(1, 2);
        let board = Drawboard::new(&other);
        assert_eq!(board.get(0, 2), EMPTY);
        assert_eq!(board.get(1, 2), 1);
    }

    #[test]
    #[should_panic]
    fn rejects_two_live_boards() {
        let state = State::new();
        let _first = Drawboard::new(&state);
        let _second = Drawboard::new(&state);
    }
}
