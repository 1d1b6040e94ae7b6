use anyhow::{bail, Context, Result};
use log::info;

use std::io::{BufRead, Write};
use std::time::Instant;

use dynamic_connect4::{
    game::{Action, Game, RepetitionTracker},
    heuristics::{default_heuristic, Heuristic, Weighted},
    search::Searcher,
    state::{Player, State},
};

/// How a game played through the server ended
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameEnd {
    Win(Player),
    Draw,
}

/// Plays one game against a text-protocol game server
///
/// Every message is a single line. After logging in, each side sends its
/// action in the form `52E` and the server echoes it to both players.
pub struct TelnetClient<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    game_id: String,
    player: Player,
    game: Game,
    searcher: Searcher,
    heuristic: Weighted,
    state: State,
    repetitions: RepetitionTracker,
    ply: usize,
}

impl<R: BufRead, W: Write> TelnetClient<R, W> {
    pub fn new(reader: R, writer: W, game_id: &str, player: Player, searcher: Searcher) -> Self {
        Self {
            reader,
            writer,
            game_id: game_id.to_string(),
            player,
            game: *searcher.game(),
            searcher,
            heuristic: default_heuristic(),
            state: State::new(),
            repetitions: RepetitionTracker::new(),
            ply: 0,
        }
    }

    /// Starts from `state` instead of the usual opening position
    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Sends `<game id> <colour>` and waits for the server to echo it back
    pub fn login(&mut self) -> Result<()> {
        let login = format!("{} {}", self.game_id, self.player.colour());
        self.send_line(&login)?;
        loop {
            let response = self.read_line()?;
            if response == login {
                return Ok(());
            }
        }
    }

    /// Plays until the game is won or drawn by repetition
    pub fn play(&mut self) -> Result<GameEnd> {
        info!("\n{}", self.state);
        while !self.game.is_terminal(&self.state) {
            self.ply += 1;
            let start_time = Instant::now();
            let is_our_turn = self.state.to_move() == self.player;

            let action = if is_our_turn {
                let action = self
                    .searcher
                    .search(&self.state, &self.heuristic, self.state.is_player_one);
                let sent = action.to_string();
                self.send_line(&sent)?;
                // the server echoes our own move back
                let echo = self.read_line()?;
                if echo != sent {
                    bail!("server answered {:?} to our move {}", echo, sent);
                }
                action
            } else {
                self.receive()?
            };

            self.state = self.game.result(&self.state, action);
            self.log_turn(action, is_our_turn, start_time);

            self.repetitions.push(self.state);
            if self.repetitions.repeats() > 0 {
                info!("position repeated {} times in a row", self.repetitions.repeats());
            }
            if self.repetitions.is_draw() {
                info!("draw by repetition after {} moves", self.ply);
                return Ok(GameEnd::Draw);
            }
        }

        let winner = self.state.to_move().other();
        info!(
            "{} ({}) wins{}",
            winner,
            winner.colour(),
            if winner == self.player { ", we won" } else { "" }
        );
        Ok(GameEnd::Win(winner))
    }

    fn receive(&mut self) -> Result<Action> {
        let response = self.read_line()?;
        self.game
            .parse_legal_action(&self.state, &response)
            .with_context(|| format!("invalid input from server: {:?}", response))
    }

    fn log_turn(&self, action: Action, is_our_turn: bool, start_time: Instant) {
        info!("\n{}", self.state);
        info!("move #{}", self.ply);
        if is_our_turn {
            info!(
                "{} nodes searched with max depth {}",
                self.searcher.last_node_count(),
                self.searcher.last_depth_reached()
            );
        }
        info!("turn took {:.3} seconds", start_time.elapsed().as_secs_f64());
        info!("action: {}", action);
        info!("position evaluation: {}", self.heuristic.evaluate(&self.state));
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        info!("Sending: {}", line);
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            bail!("server closed the connection");
        }
        let line = line.trim().to_string();
        info!("Response: {}", line);
        Ok(line)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dynamic_connect4::search::SearchConfig;
    use std::io::Cursor;
    use std::time::Duration;

    // white can complete a row on (2,4) to (5,4) with 25E
    const NEAR_WIN: &str = "X      \n       \n      X\n X     \n O OOO \n      X\nX O  XO\n";

    fn connect(input: &str, player: Player) -> Result<TelnetClient<Cursor<Vec<u8>>, Vec<u8>>> {
        let searcher = Searcher::with_config(
            Game::new(),
            SearchConfig {
                time_limit: Duration::from_millis(500),
                table_size: 1 << 12,
                max_depth: Some(2),
                debug: false,
            },
        );
        Ok(TelnetClient::new(
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
            "game7",
            player,
            searcher,
        )
        .with_state(State::parse(NEAR_WIN)?))
    }

    fn sent(client: &TelnetClient<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&client.writer).into_owned()
    }

    #[test]
    fn login_waits_for_echo() -> Result<()> {
        let mut client = connect("welcome\ngame7 white\n", Player::One)?;
        client.login()?;
        assert_eq!(sent(&client), "game7 white\n");

        let mut client = connect("welcome\n", Player::Two)?;
        assert!(client.login().is_err());
        Ok(())
    }

    #[test]
    fn plays_winning_move() -> Result<()> {
        let mut client = connect("game7 white\n25E\n", Player::One)?;
        client.login()?;
        assert_eq!(client.play()?, GameEnd::Win(Player::One));
        assert_eq!(sent(&client), "game7 white\n25E\n");
        Ok(())
    }

    #[test]
    fn checks_the_echo_of_our_move() -> Result<()> {
        let mut client = connect("game7 white\n25W\n", Player::One)?;
        client.login()?;
        assert!(client.play().is_err());
        assert_eq!(sent(&client), "game7 white\n25E\n");
        Ok(())
    }

    #[test]
    fn applies_opponent_moves() -> Result<()> {
        let mut client = connect("game7 black\n 25E \n", Player::Two)?;
        client.login()?;
        assert_eq!(client.play()?, GameEnd::Win(Player::One));
        assert!(client.game.is_terminal(client.state()));
        assert_eq!(sent(&client), "game7 black\n");
        Ok(())
    }

    #[test]
    fn rejects_illegal_opponent_moves() -> Result<()> {
        // (1,1) is a black piece
        let mut client = connect("game7 black\n11E\n", Player::Two)?;
        client.login()?;
        assert!(client.play().is_err());

        let mut client = connect("game7 black\nhello\n", Player::Two)?;
        client.login()?;
        assert!(client.play().is_err());

        let mut client = connect("game7 black\n", Player::Two)?;
        client.login()?;
        assert!(client.play().is_err());
        Ok(())
    }
}
