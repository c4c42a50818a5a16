//! Interactive session driver
//!
//! Line-oriented command loop over a [`Carousel`]. Each line holds one
//! command; the window is re-rendered as text after every command that
//! changed what is on screen.
//!
//! | Input        | Action                                   |
//! |--------------|------------------------------------------|
//! | `.` / `n`    | next                                     |
//! | `,` / `p`    | previous                                 |
//! | `a` / `d`    | delete left / right item (window ≤ 2)    |
//! | `s`          | delete the blurrier item (window = 2)    |
//! | `1`–`9`      | delete the n-th item of the window       |
//! | `y` / `z`    | undo last deletion                       |
//! | `r N`        | show N items at once                     |
//! | `l I J`      | swap the I-th and J-th item              |
//! | `x` / `q`    | quit                                     |

use crate::carousel::Carousel;
use crate::error::Result;
use std::io::{BufRead, Write};
use tracing::{debug, error, info};

/// Items shown side by side at startup
pub const DEFAULT_WINDOW: usize = 2;

/// Largest window selectable with `r`
pub const MAX_WINDOW: usize = 9;

/// One parsed input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    DeleteLeft,
    DeleteRight,
    DeleteBlurrier,
    /// 1-based position in the window
    DeleteNth(usize),
    Undo,
    Resize(usize),
    /// 1-based positions in the window
    Swap(usize, usize),
    Quit,
}

/// Parse a window position (`1`–`9`)
fn position(token: &str) -> Option<usize> {
    token
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_WINDOW).contains(n))
}

/// Parse one input line; None for blank or unrecognised input
pub fn parse_command(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let head = tokens.next()?;

    let command = match head {
        "." | "n" => Command::Next,
        "," | "p" => Command::Previous,
        "a" => Command::DeleteLeft,
        "d" => Command::DeleteRight,
        "s" => Command::DeleteBlurrier,
        "y" | "z" => Command::Undo,
        "x" | "q" => Command::Quit,
        "r" => Command::Resize(position(tokens.next()?)?),
        "l" => {
            let first = position(tokens.next()?)?;
            let second = position(tokens.next()?)?;
            Command::Swap(first, second)
        }
        other => Command::DeleteNth(position(other)?),
    };

    Some(command)
}

/// What the loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Screen changed
    Render,
    /// Nothing happened
    Idle,
    Quit,
}

/// Session state on top of a carousel
pub struct Session<'a> {
    carousel: &'a mut Carousel,
    window_size: usize,
    threshold: f64,
}

impl<'a> Session<'a> {
    /// `threshold` is the minimum focus difference for [`Command::DeleteBlurrier`]
    pub fn new(carousel: &'a mut Carousel, threshold: f64) -> Self {
        Self {
            carousel,
            window_size: DEFAULT_WINDOW,
            threshold,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn carousel(&self) -> &Carousel {
        &*self.carousel
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        let window = self.window_size;

        let changed = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Next => self.carousel.move_next(),
            Command::Previous => self.carousel.move_previous(),
            Command::DeleteLeft | Command::DeleteRight | Command::DeleteBlurrier => {
                self.quick_delete(command)?
            }
            Command::DeleteNth(n) => {
                n <= window && self.carousel.delete(n - 1, window)?.is_some()
            }
            Command::Undo => {
                if self.carousel.restore_last()?.is_none() {
                    info!("Nothing to restore");
                }
                true
            }
            Command::Resize(n) => {
                debug!("Window size {} -> {}", window, n);
                self.window_size = n;
                true
            }
            Command::Swap(first, second) => {
                first <= window
                    && second <= window
                    && self.carousel.swap(first - 1, second - 1, window)
            }
        };

        Ok(if changed { Outcome::Render } else { Outcome::Idle })
    }

    /// Single-key deletes only make sense for one or two items on screen
    fn quick_delete(&mut self, command: Command) -> Result<bool> {
        let window = self.window_size;
        let deleted = match (window, command) {
            (1, Command::DeleteRight) => self.carousel.delete(0, window)?,
            (2, _) if self.carousel.len() > 1 => match command {
                Command::DeleteLeft => self.carousel.delete(0, window)?,
                Command::DeleteRight => self.carousel.delete(1, window)?,
                _ => self.carousel.delete_blurrier(self.threshold, window)?,
            },
            _ => None,
        };
        Ok(deleted.is_some())
    }

    /// Write the current window as text
    pub fn render<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let cursor = self.carousel.cursor();
        let total = self.carousel.len();
        let items = self.carousel.window(self.window_size);

        writeln!(out, "[{}/{}]", cursor + 1, total)?;
        for (i, item) in items.iter().enumerate() {
            let focus = item
                .score()
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| "-".to_string());
            writeln!(out, "  {}. {} (focus {})", i + 1, item.key(), focus)?;
        }
        Ok(())
    }
}

/// Run commands from `input` until quit, end of input, or fewer than two
/// items remain
///
/// A failing command is reported on `output` and the session continues.
pub fn run_session<R: BufRead, W: Write>(
    carousel: &mut Carousel,
    input: R,
    mut output: W,
    threshold: f64,
) -> Result<()> {
    let mut session = Session::new(carousel, threshold);
    session.render(&mut output)?;

    for line in input.lines() {
        let line = line?;
        let Some(command) = parse_command(&line) else {
            debug!("Unrecognised input {:?}", line);
            continue;
        };

        match session.execute(command) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Render) => session.render(&mut output)?,
            Ok(Outcome::Idle) => {}
            Err(e) => {
                error!("Command {:?} failed: {}", command, e);
                writeln!(output, "error: {e}")?;
            }
        }

        if session.carousel().len() < 2 {
            info!("Fewer than two items left, ending session");
            break;
        }
    }

    output.flush()?;
    Ok(())
}
