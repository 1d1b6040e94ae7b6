use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use dynamic_connect4::{
    point::Point,
    state::{Player, State},
    BOARD_SIZE,
};

/// Draws the board with coloured pieces, column numbers across the top and row numbers down the side
pub fn display(state: &State) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=BOARD_SIZE).map(|x| format!(" {}", x)).collect();
    stdout.queue(PrintStyledContent(style(format!(" {}\n", cols)).attribute(Attribute::Bold)))?;

    for y in 0..BOARD_SIZE {
        stdout.queue(PrintStyledContent(style(format!("{} ", y + 1)).attribute(Attribute::Bold)))?;
        for x in 0..BOARD_SIZE {
            let cell = match state.owner(Point::new(x, y)) {
                Some(player @ Player::One) => style(player.symbol())
                    .attribute(Attribute::Bold)
                    .with(Color::Red),
                Some(player @ Player::Two) => style(player.symbol())
                    .attribute(Attribute::Bold)
                    .with(Color::Yellow),
                None => style('.').attribute(Attribute::Dim),
            };
            stdout
                .queue(PrintStyledContent(style(' ')))?
                .queue(PrintStyledContent(cell))?;
        }
        stdout.queue(PrintStyledContent(style('\n')))?;
    }
    stdout.flush()?;
    Ok(())
}
