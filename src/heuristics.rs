//! Static evaluation of non-terminal positions
//!
//! Every evaluator scores a position as player 1's sub-score minus player 2's
//! sub-score, so positive values favour player 1. Evaluators are run at every
//! leaf and for move ordering at every interior node, so they must stay cheap.

use crate::{
    drawboard::{Drawboard, EMPTY},
    game::Eval,
    state::{Player, State},
    BOARD_SIZE,
};

/// Largest magnitude a combined heuristic may return
///
/// Keeps heuristic values strictly away from the win sentinels.
pub const HEURISTIC_LIMIT: Eval = 1e30;

/// Penalty for a piece on its starting edge column whose way to the centre is blocked
pub const BLOCKED_PENALTY: Eval = 0.5;

/// A static evaluation function
pub trait Heuristic: Send + Sync {
    fn evaluate(&self, state: &State) -> Eval;
}

impl<F> Heuristic for F
where
    F: Fn(&State) -> Eval + Send + Sync,
{
    fn evaluate(&self, state: &State) -> Eval {
        self(state)
    }
}

/// A weighted sum of heuristics, clamped to `±HEURISTIC_LIMIT`
#[derive(Default)]
pub struct Weighted {
    terms: Vec<(Box<dyn Heuristic>, Eval)>,
}

impl Weighted {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn with<H: Heuristic + 'static>(mut self, heuristic: H, weight: Eval) -> Self {
        self.terms.push((Box::new(heuristic), weight));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Heuristic for Weighted {
    fn evaluate(&self, state: &State) -> Eval {
        let sum: Eval = self
            .terms
            .iter()
            .map(|(heuristic, weight)| weight * heuristic.evaluate(state))
            .sum();
        sum.max(-HEURISTIC_LIMIT).min(HEURISTIC_LIMIT)
    }
}

/// The weighting used for tournament play
pub fn default_heuristic() -> Weighted {
    Weighted::new()
        .with(
            ConnectedPieces {
                scoring: RunScoring::Odd,
                ..ConnectedPieces::default()
            },
            1.0,
        )
        .with(CentralDominance::with_density_bonus(), 1.0)
}

/// Forward steps from a piece; the other half of each line is covered by the
/// pieces sorted before it
const FORWARD: [(i32, i32, bool); 4] = [(1, -1, true), (1, 0, false), (1, 1, true), (0, 1, false)];

/// How a run of consecutive neighbours is scored
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunScoring {
    /// One point per neighbour in the run, N(N-1)/2 for a line of N pieces
    Linear,
    /// 2k-1 points for a walk of k neighbours, (N-1)^2 for a line of N pieces
    Odd,
}

/// Rewards pieces lined up next to each other
#[derive(Copy, Clone, Debug)]
pub struct ConnectedPieces {
    pub scoring: RunScoring,
    /// Scale applied to diagonal and anti-diagonal lines
    pub diagonal_factor: Eval,
}

impl Default for ConnectedPieces {
    fn default() -> Self {
        Self {
            scoring: RunScoring::Linear,
            diagonal_factor: 1.0,
        }
    }
}

impl ConnectedPieces {
    fn eval(&self, player: Player, state: &State, board: &Drawboard) -> Eval {
        let mut result = 0.0;
        for piece in state.pieces(player).iter() {
            let (x, y) = (piece.x() as i32, piece.y() as i32);
            for &(dx, dy, diagonal) in FORWARD.iter() {
                let mut count = 0;
                while board.is(x + (count + 1) * dx, y + (count + 1) * dy, player) {
                    count += 1;
                }
                if count == 0 {
                    continue;
                }
                let score = match self.scoring {
                    RunScoring::Linear => count as Eval,
                    RunScoring::Odd => (2 * count - 1) as Eval,
                };
                result += if diagonal {
                    score * self.diagonal_factor
                } else {
                    score
                };
            }
        }
        result
    }
}

impl Heuristic for ConnectedPieces {
    fn evaluate(&self, state: &State) -> Eval {
        let board = Drawboard::new(state);
        self.eval(Player::One, state, &board) - self.eval(Player::Two, state, &board)
    }
}

/// Rewards adjacent pairs and pairs separated by a single friendly or empty cell
#[derive(Copy, Clone, Debug, Default)]
pub struct NearlyConnected;

impl NearlyConnected {
    fn eval(player: Player, state: &State, board: &Drawboard) -> Eval {
        let mut result = 0.0;
        let pieces = state.pieces(player);
        for (i, first) in pieces.iter().enumerate() {
            for second in pieces[i + 1..].iter() {
                let dx = (second.x() as i32 - first.x() as i32).abs();
                let dy = (second.y() as i32 - first.y() as i32).abs();
                match dx.max(dy) {
                    1 => result += 1.0,
                    2 if dx % 2 == 0 && dy % 2 == 0 => {
                        let mx = (first.x() + second.x()) as i32 / 2;
                        let my = (first.y() + second.y()) as i32 / 2;
                        let middle = board.get(mx, my);
                        if middle == player.cell() {
                            result += 1.0;
                        } else if middle == EMPTY {
                            result += if dx == 0 || dy == 0 { 0.40625 } else { 0.09375 };
                        }
                    }
                    _ => {}
                }
            }
        }
        result
    }
}

impl Heuristic for NearlyConnected {
    fn evaluate(&self, state: &State) -> Eval {
        let board = Drawboard::new(state);
        Self::eval(Player::One, state, &board) - Self::eval(Player::Two, state, &board)
    }
}

/// Rewards keeping pieces within a small bounding box
#[derive(Copy, Clone, Debug, Default)]
pub struct Proximity;

impl Proximity {
    fn eval(player: Player, state: &State) -> Eval {
        let pieces = state.pieces(player);
        let (mut min_x, mut max_x) = (BOARD_SIZE, 0);
        let (mut min_y, mut max_y) = (BOARD_SIZE, 0);
        for piece in pieces.iter() {
            min_x = min_x.min(piece.x());
            max_x = max_x.max(piece.x());
            min_y = min_y.min(piece.y());
            max_y = max_y.max(piece.y());
        }
        let area = (max_x - min_x + 1) * (max_y - min_y + 1);
        (BOARD_SIZE * BOARD_SIZE - area) as Eval
    }
}

impl Heuristic for Proximity {
    fn evaluate(&self, state: &State) -> Eval {
        Self::eval(Player::One, state) - Self::eval(Player::Two, state)
    }
}

/// Per-cell value of a piece, the border is worthless and the centre is worth most
const CENTRAL_TABLE: [[Eval; BOARD_SIZE]; BOARD_SIZE] = [
    [0.0000, 0.0000, 0.0000, 0.0000, 0.0000, 0.0000, 0.0000],
    [0.0000, 0.8125, 1.0000, 1.1875, 1.0000, 0.8125, 0.0000],
    [0.0000, 1.0000, 2.0000, 2.1875, 2.0000, 1.0000, 0.0000],
    [0.0000, 1.1875, 2.1875, 2.3750, 2.1875, 1.1875, 0.0000],
    [0.0000, 1.0000, 2.0000, 2.1875, 2.0000, 1.0000, 0.0000],
    [0.0000, 0.8125, 1.0000, 1.1875, 1.0000, 0.8125, 0.0000],
    [0.0000, 0.0000, 0.0000, 0.0000, 0.0000, 0.0000, 0.0000],
];

/// Rewards control of the centre of the board
#[derive(Copy, Clone, Debug, Default)]
pub struct CentralDominance {
    /// Multiply the score when three or more pieces sit on valued cells
    pub density_bonus: bool,
    /// Penalise edge pieces whose step toward the centre is blocked by the opponent
    pub blocking_penalty: bool,
}

impl CentralDominance {
    pub fn with_density_bonus() -> Self {
        Self {
            density_bonus: true,
            blocking_penalty: false,
        }
    }

    fn eval(&self, player: Player, state: &State) -> Eval {
        let mut result = 0.0;
        let mut central = 0;
        for piece in state.pieces(player).iter() {
            let value = CENTRAL_TABLE[piece.x()][piece.y()];
            result += value;
            if value > 0.0 {
                central += 1;
            }
        }

        if self.density_bonus {
            result *= match central {
                3 => 1.09375,
                4 => 1.25,
                5..=6 => 1.21875,
                _ => 1.0,
            };
        }

        if self.blocking_penalty {
            let opponent = player.other();
            for piece in state.pieces(player).iter() {
                let toward_centre = match piece.x() {
                    0 => piece.offset(1, 0),
                    x if x == BOARD_SIZE - 1 => piece.offset(-1, 0),
                    _ => None,
                };
                if toward_centre.and_then(|p| state.owner(p)) == Some(opponent) {
                    result -= BLOCKED_PENALTY;
                }
            }
        }
        result
    }
}

impl Heuristic for CentralDominance {
    fn evaluate(&self, state: &State) -> Eval {
        self.eval(Player::One, state) - self.eval(Player::Two, state)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;

    #[test]
    fn start_position_is_balanced() {
        let state = State::new();
        assert_eq!(ConnectedPieces::default().evaluate(&state), 0.0);
        assert_eq!(NearlyConnected.evaluate(&state), 0.0);
        assert_eq!(Proximity.evaluate(&state), 0.0);
        assert_eq!(CentralDominance::default().evaluate(&state), 0.0);
    }

    #[test]
    fn connected_scoring_modes() -> Result<()> {
        // three white pieces in a row, the rest scattered
        let state = State::parse(
            "O     X\n       \nX OOO  \n       \nX   X O\n     X \nO X    \n",
        )?;
        let linear = ConnectedPieces::default().evaluate(&state);
        let odd = ConnectedPieces {
            scoring: RunScoring::Odd,
            ..ConnectedPieces::default()
        }
        .evaluate(&state);
        // 2 + 1 for the white line; black has a single diagonal pair
        assert_eq!(linear, 3.0 - 1.0);
        assert_eq!(odd, 3.0 + 1.0 - 1.0);

        let diagonal = ConnectedPieces {
            diagonal_factor: 2.0,
            ..ConnectedPieces::default()
        }
        .evaluate(&state);
        assert_eq!(diagonal, 3.0 - 2.0);
        Ok(())
    }

    #[test]
    fn weighted_sum_is_clamped() {
        let state = State::new();
        let huge = Weighted::new().with(|_: &State| Eval::MAX, 2.0);
        assert_eq!(huge.evaluate(&state), HEURISTIC_LIMIT);

        let combined = Weighted::new()
            .with(|_: &State| 1.5, 2.0)
            .with(|_: &State| -1.0, 0.5);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.evaluate(&state), 2.5);
    }

    #[test]
    fn blocking_penalty_counts_opponent_in_the_way() -> Result<()> {
        let state = State::parse(
            "       \n       \nOX   XO\n   O   \nOX   XO\n       \n OX X  \n",
        )?;
        let plain = CentralDominance::default().evaluate(&state);
        let blocking = CentralDominance {
            density_bonus: false,
            blocking_penalty: true,
        }
        .evaluate(&state);
        // white pieces at (0,2), (6,2), (0,4), (6,4) are each blocked
        assert_eq!(blocking, plain - 4.0 * BLOCKED_PENALTY);
        Ok(())
    }
}
