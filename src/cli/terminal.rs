//! Colour and layout helpers for table output.

use std::sync::OnceLock;

use doables::{Priority, Status};
use owo_colors::{OwoColorize, colors::css};

/// Terminals narrower than this get the stacked layout.
const NARROW_COLUMNS: u16 = 60;

/// Whether stdout wants colour. Checked once per process.
fn colour_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| supports_color::on(supports_color::Stream::Stdout).is_some())
}

/// Whether the terminal is too narrow for a one-line-per-row table.
///
/// Output that is not going to a terminal is never narrow.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < NARROW_COLUMNS)
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Success,
    Warning,
    Info,
    Dim,
}

fn paint(text: &str, tone: Tone) -> String {
    if !colour_enabled() {
        return text.to_string();
    }
    match tone {
        Tone::Success => text.fg::<css::Green>().to_string(),
        Tone::Warning => text.fg::<css::Orange>().to_string(),
        Tone::Info => text.fg::<css::LightBlue>().to_string(),
        Tone::Dim => text.dimmed().to_string(),
    }
}

/// Colours text for the terminal, or leaves it plain when colour is off.
pub trait Colorize {
    /// Green.
    fn success(&self) -> String;
    /// Amber.
    fn warning(&self) -> String;
    /// Blue.
    fn info(&self) -> String;
    /// Dimmed.
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Tone::Success)
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Tone::Warning)
    }

    fn info(&self) -> String {
        paint(self.as_ref(), Tone::Info)
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Tone::Dim)
    }
}

/// Pads a status to `width` and colours it by lifecycle stage.
///
/// Padding happens before colouring so escape codes don't break alignment.
pub fn status(status: Status, width: usize) -> String {
    let padded = format!("{:<width$}", status.as_str());
    let tone = match status {
        Status::Pending => Tone::Info,
        Status::Allocated => Tone::Warning,
        Status::Completed => Tone::Success,
    };
    paint(&padded, tone)
}

/// Pads a priority to `width`, highlighting high priority.
pub fn priority(priority: Priority, width: usize) -> String {
    let padded = format!("{:<width$}", priority.as_str());
    match priority {
        Priority::High => paint(&padded, Tone::Warning),
        Priority::Medium => padded,
        Priority::Low => paint(&padded, Tone::Dim),
    }
}
