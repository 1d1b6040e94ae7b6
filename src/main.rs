use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use dynamic_connect4::{
    game::{Game, RepetitionTracker},
    heuristics::{default_heuristic, Heuristic},
    search::{SearchConfig, Searcher, DEFAULT_TIME_LIMIT_MS},
    state::{Player, State},
    tuning::{MatchConfig, Tuner, Weights},
};

mod client;
use client::*;

mod display;
use display::display;

/// An AI player for Dynamic Connect 4
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Play against a game server over stdin/stdout
    #[arg(short = 'n', long)]
    telnet: bool,

    /// Game id sent when logging in to the server
    #[arg(short = 'i', long)]
    game_id: Option<String>,

    /// Which player the AI controls when playing through the server
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=2))]
    player: Option<u8>,

    /// Which player a human controls in local play, 0 for AI against AI
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    human: u8,

    /// Start from the grid in this file instead of the opening position
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Search time limit in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TIME_LIMIT_MS)]
    time: u64,

    /// Log search diagnostics
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tune the heuristic weights by self-play
    Tune {
        #[arg(long, default_value_t = 20)]
        rounds: usize,

        /// Games per match, colours alternate between games
        #[arg(long, default_value_t = 16)]
        games: usize,

        /// Search time limit per move in milliseconds
        #[arg(long, default_value_t = 100)]
        time: u64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.debug {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level)?;

    if args.time == 0 {
        bail!("time limit must be greater than zero");
    }
    let config = SearchConfig {
        time_limit: Duration::from_millis(args.time),
        debug: args.debug,
        ..SearchConfig::default()
    };

    if let Some(Command::Tune {
        rounds,
        games,
        time,
    }) = args.command
    {
        if games == 0 || time == 0 {
            bail!("tuning needs at least one game per match and a non-zero time limit");
        }
        let mut tuner = Tuner::new(
            Weights::default(),
            games,
            MatchConfig {
                time_limit: Duration::from_millis(time),
                ..MatchConfig::default()
            },
        );
        tuner.run(rounds);
        println!("{}", tuner.weights());
        return Ok(());
    }

    let state = match &args.file {
        Some(path) => {
            let grid = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            State::parse(&grid).with_context(|| format!("invalid state in {}", path.display()))?
        }
        None => State::new(),
    };

    if args.telnet {
        let game_id = match args.game_id {
            Some(id) if !id.is_empty() && !id.contains(char::is_whitespace) => id,
            Some(id) => bail!("invalid game id {:?}, it must be non-empty without whitespace", id),
            None => bail!("--game-id is required with --telnet"),
        };
        let player = match args.player {
            Some(1) => Player::One,
            Some(2) => Player::Two,
            _ => bail!("--player is required with --telnet"),
        };

        let stdin = stdin();
        let mut client = TelnetClient::new(
            stdin.lock(),
            stdout(),
            &game_id,
            player,
            Searcher::with_config(Game::new(), config),
        )
        .with_state(state);
        client.login()?;
        client.play()?;
        return Ok(());
    }

    let human = match args.human {
        1 => Some(Player::One),
        2 => Some(Player::Two),
        _ => None,
    };
    play_local(state, human, config)
}

fn play_local(mut state: State, human: Option<Player>, config: SearchConfig) -> Result<()> {
    let game = Game::new();
    // keep one searcher so the transposition table carries over between moves
    let mut searcher = Searcher::with_config(game, config);
    let heuristic = default_heuristic();
    let mut repetitions = RepetitionTracker::new();
    let stdin = stdin();

    println!("Welcome to Dynamic Connect 4\n");

    // game loop
    loop {
        display(&state)?;

        if let Some(winner) = game.winner(&state) {
            println!("{} ({}) wins!", winner, winner.colour());
            break;
        }
        if repetitions.is_draw() {
            println!("Draw by repetition!");
            break;
        }

        let player = state.to_move();
        let action = if Some(player) == human {
            print!("{} ({}) move input > ", player, player.colour());
            stdout().flush()?;
            let mut input_str = String::new();
            if stdin.read_line(&mut input_str)? == 0 {
                println!();
                break;
            }

            match game.parse_legal_action(&state, input_str.trim()) {
                Err(err) => {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
                Ok(action) => action,
            }
        } else {
            println!("AI is thinking...");
            stdout().flush()?;

            let start_time = Instant::now();
            let action = searcher.search(&state, &heuristic, state.is_player_one);
            info!(
                "{} nodes searched with max depth {} in {:.3} seconds",
                searcher.last_node_count(),
                searcher.last_depth_reached(),
                start_time.elapsed().as_secs_f64()
            );
            println!("Best move: {}", action);
            action
        };

        state = game.result(&state, action);
        repetitions.push(state);
        if repetitions.repeats() > 0 {
            info!("position repeated {} times in a row", repetitions.repeats());
        }
        info!("position evaluation: {}", heuristic.evaluate(&state));
    }
    Ok(())
}
