//! An agent that picks moves with a time-limited game tree search

use log::{debug, trace};

use std::cmp::Ordering as CmpOrdering;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use crate::{
    game::{Action, Eval, Game, WIN_PLAYER_ONE, WIN_PLAYER_TWO},
    heuristics::Heuristic,
    state::State,
    transposition_table::{Flag, TranspositionTable, DEFAULT_TABLE_SIZE},
};

/// Default time budget for one search in milliseconds
pub const DEFAULT_TIME_LIMIT_MS: u64 = 20_000;

/// Minimum remaining depth at which children are sorted by the heuristic
/// before being searched; below this the sort costs more than it prunes
pub const ORDERING_MIN_DEPTH: u32 = 4;

/// Settings for a `Searcher`
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub time_limit: Duration,
    /// Maximum number of transposition table entries
    pub table_size: usize,
    /// Stop deepening after this depth even if time remains
    pub max_depth: Option<u32>,
    /// Log every completed iteration
    pub debug: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(DEFAULT_TIME_LIMIT_MS),
            table_size: DEFAULT_TABLE_SIZE,
            max_depth: None,
            debug: false,
        }
    }
}

/// A handle to cut a running search short from another thread
///
/// Stopping sets the time limit to zero, the search notices at its next
/// node and returns the best action of its last completed iteration.
#[derive(Clone, Debug)]
pub struct StopHandle {
    time_limit_ms: Arc<AtomicU64>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.time_limit_ms.store(0, Ordering::SeqCst);
    }

    /// Restores a time limit for the next search
    pub fn reset(&self, time_limit: Duration) {
        self.time_limit_ms
            .store(time_limit.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms.load(Ordering::SeqCst))
    }
}

/// Iterative deepening alpha-beta search with a transposition table
///
/// # Evaluation
/// Values are from player 1's point of view: `WIN_PLAYER_ONE` (`f32::MAX`)
/// is a forced win for player 1 and `WIN_PLAYER_TWO` (`f32::MIN`) one for
/// player 2. Positions cut off before the end of the game are scored by the
/// heuristic passed to [`Searcher::search`].
///
/// # Time limit
/// The deepening loop runs until the time limit expires and then answers with
/// the best action of the deepest completed iteration. The first iteration
/// only evaluates the root's children and always completes.
pub struct Searcher {
    game: Game,
    table: TranspositionTable,
    time_limit_ms: Arc<AtomicU64>,
    max_depth: Option<u32>,
    debug: bool,

    start_time: Instant,
    timed_out: bool,
    node_count: usize,
    depth_reached: u32,
    value: Eval,
}

impl Searcher {
    pub fn new(game: Game) -> Self {
        Self::with_config(game, SearchConfig::default())
    }

    pub fn with_config(game: Game, config: SearchConfig) -> Self {
        Self {
            game,
            table: TranspositionTable::new(config.table_size),
            time_limit_ms: Arc::new(AtomicU64::new(config.time_limit.as_millis() as u64)),
            max_depth: config.max_depth,
            debug: config.debug,
            start_time: Instant::now(),
            timed_out: false,
            node_count: 0,
            depth_reached: 0,
            value: 0.0,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            time_limit_ms: Arc::clone(&self.time_limit_ms),
        }
    }

    /// Forces any running search to finish at its next node
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Restores a time limit after `stop`
    pub fn reset(&self, time_limit: Duration) {
        self.stop_handle().reset(time_limit);
    }

    /// Picks an action for the player to move in `state`
    ///
    /// `is_max` is true when the player to move wants to maximise the
    /// evaluation, i.e. is player 1.
    ///
    /// # Panics
    /// If `state` has no legal actions. Terminal positions must be filtered
    /// out by the caller.
    pub fn search(&mut self, state: &State, heuristic: &dyn Heuristic, is_max: bool) -> Action {
        self.node_count = 1;
        self.depth_reached = 0;
        self.timed_out = false;
        self.start_time = Instant::now();

        let mut actions = self.game.actions(state);
        assert!(
            !actions.is_empty(),
            "search requires a position with at least one legal action"
        );

        let (win, loss) = if is_max {
            (WIN_PLAYER_ONE, WIN_PLAYER_TWO)
        } else {
            (WIN_PLAYER_TWO, WIN_PLAYER_ONE)
        };
        self.value = loss;

        let mut depth = 1;
        loop {
            let mut alpha = Eval::MIN;
            let mut beta = Eval::MAX;

            let mut ranked = Vec::with_capacity(actions.len());
            for &action in actions.iter() {
                let next = self.game.result(state, action);
                let value = self.alpha_beta(&next, alpha, beta, depth - 1, !is_max, heuristic);
                if value == win {
                    // a forced win, no need to look any further
                    self.finish(depth, value, action);
                    return action;
                }
                if self.timed_out {
                    // abandon this iteration, the previous best is still first
                    self.depth_reached = depth - 1;
                    trace!(
                        "search timed out at depth {} after {} nodes, playing {}",
                        depth,
                        self.node_count,
                        actions[0]
                    );
                    return actions[0];
                }
                ranked.push((action, value));
                if is_max {
                    alpha = alpha.max(value);
                } else {
                    beta = beta.min(value);
                }
            }

            // the sort is stable so ties keep their order from earlier iterations
            ranked.sort_by(|a, b| compare(a.1, b.1, is_max));
            actions = ranked.iter().map(|&(action, _)| action).collect();
            let (best_action, best_value) = ranked[0];
            self.value = best_value;

            if self.debug {
                debug!(
                    "depth {}: best {} ({}), {} nodes, {}/{} table entries",
                    depth,
                    best_action,
                    best_value,
                    self.node_count,
                    self.table.len(),
                    self.table.max_size()
                );
            }

            // every action loses, or only the best one avoids losing
            if best_value == loss || (ranked.len() >= 2 && ranked[1].1 == loss) {
                // stale distance-to-loss values would bias the following searches
                self.table.clear();
                self.finish(depth, best_value, best_action);
                return best_action;
            }

            if self.max_depth.map_or(false, |max| depth >= max) {
                self.finish(depth, best_value, best_action);
                return best_action;
            }
            depth += 1;
        }
    }

    fn finish(&mut self, depth: u32, value: Eval, action: Action) {
        self.depth_reached = depth;
        self.value = value;
        trace!(
            "search finished at depth {} after {} nodes, playing {} ({})",
            depth,
            self.node_count,
            action,
            value
        );
    }

    /// Alpha-beta search of `state` with `remaining` plies left
    fn alpha_beta(
        &mut self,
        state: &State,
        mut alpha: Eval,
        mut beta: Eval,
        remaining: u32,
        is_max: bool,
        heuristic: &dyn Heuristic,
    ) -> Eval {
        self.node_count += 1;
        if self.game.is_terminal(state) {
            return self.game.utility(state);
        }
        if remaining == 0 || self.is_time_up() {
            return heuristic.evaluate(state);
        }

        // only trust entries searched at least as deep as we need
        if let Some(entry) = self.table.find(state) {
            if entry.depth >= remaining {
                match entry.flag {
                    Flag::Exact => return entry.value,
                    Flag::LowerBound => alpha = alpha.max(entry.value),
                    Flag::UpperBound => beta = beta.min(entry.value),
                }
                if alpha >= beta {
                    return entry.value;
                }
            }
        }
        let (window_alpha, window_beta) = (alpha, beta);

        let mut actions = self.game.actions(state);
        if remaining >= ORDERING_MIN_DEPTH {
            self.order(state, &mut actions, is_max, heuristic);
        }

        let mut best = if is_max { Eval::MIN } else { Eval::MAX };
        for action in actions {
            let next = self.game.result(state, action);
            let value = self.alpha_beta(&next, alpha, beta, remaining - 1, !is_max, heuristic);
            if is_max {
                best = best.max(value);
                alpha = alpha.max(best);
            } else {
                best = best.min(value);
                beta = beta.min(best);
            }
            if alpha >= beta {
                break;
            }
        }

        // a subtree cut short by the clock has no trustworthy value
        if !self.timed_out {
            let flag = if best <= window_alpha {
                Flag::UpperBound
            } else if best >= window_beta {
                Flag::LowerBound
            } else {
                Flag::Exact
            };
            self.table.emplace(*state, best, remaining, flag);
        }
        best
    }

    /// Sorts actions best-first by the heuristic value of the position they lead to
    fn order(&self, state: &State, actions: &mut Vec<Action>, is_max: bool, heuristic: &dyn Heuristic) {
        let mut scored: Vec<(Action, Eval)> = actions
            .iter()
            .map(|&action| (action, heuristic.evaluate(&self.game.result(state, action))))
            .collect();
        scored.sort_by(|a, b| compare(a.1, b.1, is_max));
        actions.clear();
        actions.extend(scored.into_iter().map(|(action, _)| action));
    }

    fn is_time_up(&mut self) -> bool {
        if !self.timed_out {
            let limit = self.time_limit_ms.load(Ordering::Relaxed);
            self.timed_out = self.start_time.elapsed().as_millis() as u64 >= limit;
        }
        self.timed_out
    }

    /// Number of nodes visited by the last search
    pub fn last_node_count(&self) -> usize {
        self.node_count
    }

    /// Depth of the deepest completed iteration of the last search
    pub fn last_depth_reached(&self) -> u32 {
        self.depth_reached
    }

    /// Value of the action returned by the last search, when its iteration completed
    pub fn last_value(&self) -> Eval {
        self.value
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn table_hit_rate(&self) -> f64 {
        self.table.hit_rate()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }
}

/// Orders values best-first for the player to move
fn compare(a: Eval, b: Eval, is_max: bool) -> CmpOrdering {
    let ordering = a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal);
    if is_max {
        ordering.reverse()
    } else {
        ordering
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::heuristics::default_heuristic;

    fn opening_child() -> (Searcher, State) {
        let searcher = Searcher::with_config(
            Game::new(),
            SearchConfig {
                time_limit: Duration::from_secs(60),
                table_size: 1 << 12,
                ..SearchConfig::default()
            },
        );
        let start = State::new();
        let action = searcher.game().actions(&start)[0];
        let child = searcher.game().result(&start, action);
        (searcher, child)
    }

    #[test]
    fn shallow_entries_are_ignored() {
        let (mut searcher, child) = opening_child();
        let heuristic = default_heuristic();

        searcher.table.emplace(child, WIN_PLAYER_ONE, 1, Flag::Exact);
        let value = searcher.alpha_beta(&child, Eval::MIN, Eval::MAX, 2, false, &heuristic);
        assert_ne!(value, WIN_PLAYER_ONE);
        assert_eq!(searcher.table.find(&child).map(|e| e.depth), Some(2));

        searcher.table.emplace(child, WIN_PLAYER_ONE, 2, Flag::Exact);
        let value = searcher.alpha_beta(&child, Eval::MIN, Eval::MAX, 2, false, &heuristic);
        assert_eq!(value, WIN_PLAYER_ONE);
    }

    #[test]
    fn bounds_narrow_the_window() {
        let (mut searcher, child) = opening_child();
        let heuristic = default_heuristic();

        searcher.table.emplace(child, 5.0, 3, Flag::LowerBound);
        let value = searcher.alpha_beta(&child, Eval::MIN, 4.0, 2, false, &heuristic);
        assert_eq!(value, 5.0);

        searcher.table.emplace(child, -5.0, 3, Flag::UpperBound);
        let value = searcher.alpha_beta(&child, -4.0, Eval::MAX, 2, false, &heuristic);
        assert_eq!(value, -5.0);
    }

    #[test]
    fn stored_flags_follow_the_window() {
        let (mut searcher, child) = opening_child();
        let heuristic = default_heuristic();
        let flag = |searcher: &mut Searcher| searcher.table.find(&child).map(|e| e.flag);

        let value = searcher.alpha_beta(&child, Eval::MIN, Eval::MAX, 1, false, &heuristic);
        assert_eq!(flag(&mut searcher), Some(Flag::Exact));

        // every value is at most alpha: fail-low
        searcher.table.clear();
        searcher.alpha_beta(&child, value + 1.0, Eval::MAX, 1, false, &heuristic);
        assert_eq!(flag(&mut searcher), Some(Flag::UpperBound));

        // the true value is at least beta: fail-high
        searcher.table.clear();
        let bound = searcher.alpha_beta(&child, Eval::MIN, value - 1.0, 1, false, &heuristic);
        assert_eq!(bound, value);
        assert_eq!(flag(&mut searcher), Some(Flag::LowerBound));
    }

    #[test]
    fn expired_clock_stores_nothing() {
        let (mut searcher, child) = opening_child();
        let heuristic = default_heuristic();

        searcher.stop();
        let value = searcher.alpha_beta(&child, Eval::MIN, Eval::MAX, 3, false, &heuristic);
        assert_eq!(value, heuristic.evaluate(&child));
        assert!(searcher.timed_out);
        assert!(searcher.table.is_empty());

        // the flag is sticky even once the limit is restored
        searcher.reset(Duration::from_secs(60));
        searcher.alpha_beta(&child, Eval::MIN, Eval::MAX, 3, false, &heuristic);
        assert!(searcher.table.is_empty());
    }

    #[test]
    fn compare_puts_best_first() {
        let mut values = vec![1.0, -2.0, 3.0];
        values.sort_by(|a, b| compare(*a, *b, true));
        assert_eq!(values, vec![3.0, 1.0, -2.0]);
        values.sort_by(|a, b| compare(*a, *b, false));
        assert_eq!(values, vec![-2.0, 1.0, 3.0]);
    }
}
