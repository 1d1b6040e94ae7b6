//! Tunes heuristic weights by self-play
//!
//! Each round nudges one weight up or down and plays a match between the
//! candidate and the current weights, keeping the candidate if it scores
//! more than half the points. Games within a match are played in parallel.

use indicatif::*;
use log::info;
use rayon::prelude::*;

use std::fmt;
use std::time::{Duration, Instant};

use crate::{
    game::{Eval, Game, RepetitionTracker},
    heuristics::*,
    search::{SearchConfig, Searcher},
    state::{Player, State},
};

/// Number of tunable weights
pub const NUM_WEIGHTS: usize = 4;

/// Relative size of one tuning step
pub const DEFAULT_STEP: Eval = 0.2;

/// Weights of the line-building, near-connection, compactness and centre terms
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Weights(pub [Eval; NUM_WEIGHTS]);

impl Weights {
    pub fn heuristic(&self) -> Weighted {
        Weighted::new()
            .with(
                ConnectedPieces {
                    scoring: RunScoring::Odd,
                    ..ConnectedPieces::default()
                },
                self.0[0],
            )
            .with(NearlyConnected, self.0[1])
            .with(Proximity, self.0[2])
            .with(CentralDominance::with_density_bonus(), self.0[3])
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self([1.0; NUM_WEIGHTS])
    }
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for weight in self.0.iter() {
            write!(f, " {:.5}", weight)?;
        }
        write!(f, " )")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win(Player),
    Draw,
}

/// Settings for a single self-play game
#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub time_limit: Duration,
    pub max_depth: Option<u32>,
    /// Games reaching this many plies are scored as draws
    pub max_plies: usize,
    pub table_size: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(100),
            max_depth: None,
            max_plies: 200,
            table_size: 1 << 16,
        }
    }
}

/// Plays one game between two weightings, returning the outcome and its length in plies
pub fn play_game(white: &Weights, black: &Weights, config: &MatchConfig) -> (Outcome, usize) {
    let game = Game::new();
    let search_config = SearchConfig {
        time_limit: config.time_limit,
        table_size: config.table_size,
        max_depth: config.max_depth,
        debug: false,
    };
    let mut searchers = [
        Searcher::with_config(game, search_config.clone()),
        Searcher::with_config(game, search_config),
    ];
    let heuristics = [white.heuristic(), black.heuristic()];

    let mut state = State::new();
    let mut repetitions = RepetitionTracker::new();
    for ply in 1..=config.max_plies {
        let side = if state.is_player_one { 0 } else { 1 };
        let action = searchers[side].search(&state, &heuristics[side], state.is_player_one);
        state = game.result(&state, action);

        if let Some(winner) = game.winner(&state) {
            return (Outcome::Win(winner), ply);
        }
        repetitions.push(state);
        if repetitions.is_draw() {
            return (Outcome::Draw, ply);
        }
    }
    (Outcome::Draw, config.max_plies)
}

pub struct Tuner {
    weights: Weights,
    step: Eval,
    games: usize,
    config: MatchConfig,
    round: usize,
}

impl Tuner {
    pub fn new(weights: Weights, games: usize, config: MatchConfig) -> Self {
        Self {
            weights,
            step: DEFAULT_STEP,
            games,
            config,
            round: 0,
        }
    }

    pub fn with_step(mut self, step: Eval) -> Self {
        self.step = step;
        self
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// The weights challenging the current ones this round
    ///
    /// Rounds cycle through the weights, raising one and then lowering it.
    pub fn candidate(&self) -> Weights {
        let index = (self.round / 2) % NUM_WEIGHTS;
        let sign = if self.round % 2 == 0 { 1.0 } else { -1.0 };
        let mut candidate = self.weights;
        candidate.0[index] *= 1.0 + sign * self.step;
        candidate
    }

    /// Plays a match and returns the points scored by `candidate`, 1 per win and 0.5 per draw
    pub fn play_match(&self, candidate: &Weights, progress: &ProgressBar) -> Eval {
        let incumbent = self.weights;
        (0..self.games)
            .into_par_iter()
            .map(|i| {
                // alternate colours so neither side always moves first
                let candidate_player = if i % 2 == 0 { Player::One } else { Player::Two };
                let (outcome, _) = match candidate_player {
                    Player::One => play_game(candidate, &incumbent, &self.config),
                    Player::Two => play_game(&incumbent, candidate, &self.config),
                };
                progress.inc(1);
                match outcome {
                    Outcome::Win(winner) if winner == candidate_player => 1.0,
                    Outcome::Win(_) => 0.0,
                    Outcome::Draw => 0.5,
                }
            })
            .sum()
    }

    /// Runs `rounds` tuning rounds and returns the final weights
    pub fn run(&mut self, rounds: usize) -> Weights {
        let start = Instant::now();
        let progress = ProgressBar::new((rounds * self.games) as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Tuning weights: {bar:40.cyan/blue} {pos}/{len} games {msg} ~{eta} remaining")
                .progress_chars("█▓▒░  "),
        );

        for _ in 0..rounds {
            let candidate = self.candidate();
            let score = self.play_match(&candidate, &progress);
            if score > self.games as Eval / 2.0 {
                info!(
                    "round {}: {} scored {}/{}, accepted",
                    self.round, candidate, score, self.games
                );
                self.weights = candidate;
            } else {
                info!(
                    "round {}: {} scored {}/{}, rejected",
                    self.round, candidate, score, self.games
                );
            }
            progress.set_message(&format!("current {}", self.weights));
            self.round += 1;
        }

        progress.finish();
        info!(
            "Tuning complete in {}, final weights {}",
            HumanDuration(start.elapsed()),
            self.weights
        );
        self.weights
    }
}
