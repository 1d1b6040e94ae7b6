//! An agent for playing the board game 'Dynamic Connect 4'
//!
//! Each player has six pieces on a 7x7 board and moves one of them a single
//! step per turn. The agent picks moves with an iterative deepening
//! alpha-beta search under a wall-clock time limit.
//!
//! # Basic Usage
//!
//! ```
//! use dynamic_connect4::{game::Game, heuristics::default_heuristic, search::*, state::State};
//! use std::time::Duration;
//!
//! let game = Game::new();
//! let mut searcher = Searcher::with_config(
//!     game,
//!     SearchConfig {
//!         time_limit: Duration::from_millis(200),
//!         ..SearchConfig::default()
//!     },
//! );
//!
//! let state = State::new();
//! let action = searcher.search(&state, &default_heuristic(), true);
//!
//! assert!(game.actions(&state).contains(&action));
//! ```

use static_assertions::*;
pub use anyhow;

pub mod point;

pub mod state;

pub mod drawboard;

pub mod game;

pub mod heuristics;

pub mod transposition_table;

pub mod search;

pub mod tuning;


/// The width and height of the game board in cells
pub const BOARD_SIZE: usize = 7;

/// The number of pieces each player owns
pub const PIECES_PER_PLAYER: usize = 6;

// ensure that coordinates fit in the 4-bit halves of a packed point
const_assert!(BOARD_SIZE <= 16);
// action notation uses a single digit per coordinate
const_assert!(BOARD_SIZE <= 9);
