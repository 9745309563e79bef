//! Console printer for transcripts and state summaries.

use serde::{Deserialize, Serialize};

use crate::dialogue::{Role, TranscriptEntry};

/// Available colors for printed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
    BoldRed,
    BoldGreen,
    BoldYellow,
    BoldBlue,
    BoldCyan,
    BoldPurple,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Cyan => "\x1b[36m",
            Self::BoldRed => "\x1b[1;31m",
            Self::BoldGreen => "\x1b[1;32m",
            Self::BoldYellow => "\x1b[1;33m",
            Self::BoldBlue => "\x1b[1;34m",
            Self::BoldCyan => "\x1b[1;36m",
            Self::BoldPurple => "\x1b[1;35m",
        }
    }

    /// Color used for a speaker's lines.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Patient => Self::Cyan,
            Role::Therapist => Self::Green,
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// A piece of colored text.
pub struct ColoredText {
    pub text: String,
    pub color: PrinterColor,
}

impl ColoredText {
    /// Create a new colored segment.
    pub fn new(text: impl Into<String>, color: PrinterColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Printer for console output with color support.
#[derive(Debug, Clone, Default)]
pub struct Printer;

impl Printer {
    /// Create a new `Printer`.
    pub fn new() -> Self {
        Self
    }

    /// Print a message with the specified color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        println!("{}", paint(content, color));
    }

    /// Print multiple colored text segments on a single line.
    pub fn print_colored(&self, segments: &[ColoredText]) {
        println!("{}", render_segments(segments));
    }

    /// Print the banner that opens a session.
    pub fn print_session_header(&self, session_number: u32) {
        self.print(
            &format!("\n===== Session {} =====", session_number),
            PrinterColor::BoldPurple,
        );
    }

    /// Print one transcript line, prefixed with the speaker.
    pub fn print_entry(&self, entry: &TranscriptEntry) {
        self.print_colored(&entry_segments(entry));
    }

    /// Print every entry in order.
    pub fn print_transcript(&self, transcript: &[TranscriptEntry]) {
        for entry in transcript {
            self.print_entry(entry);
        }
    }

    /// Print a titled state summary block.
    pub fn print_state(&self, title: &str, summary: &str) {
        self.print(title, PrinterColor::BoldYellow);
        self.print(summary, PrinterColor::Yellow);
    }
}

fn paint(content: &str, color: PrinterColor) -> String {
    format!("{}{}{}", color.ansi_code(), content, RESET)
}

fn render_segments(segments: &[ColoredText]) -> String {
    segments
        .iter()
        .map(|segment| paint(&segment.text, segment.color))
        .collect()
}

fn entry_segments(entry: &TranscriptEntry) -> Vec<ColoredText> {
    let color = PrinterColor::for_role(entry.role);
    let mut label = entry.role.as_str().to_uppercase();
    if let Some(classification) = entry.strategy_classification {
        label.push_str(&format!(" [{}]", classification));
    }
    if let Some(action) = entry.action {
        label.push_str(&format!(" ({})", action));
    }
    let body_color = if entry.failed {
        PrinterColor::Red
    } else {
        color
    };
    vec![
        ColoredText::new(format!("{}: ", label), bold(color)),
        ColoredText::new(entry.content.clone(), body_color),
    ]
}

fn bold(color: PrinterColor) -> PrinterColor {
    match color {
        PrinterColor::Red => PrinterColor::BoldRed,
        PrinterColor::Green => PrinterColor::BoldGreen,
        PrinterColor::Yellow => PrinterColor::BoldYellow,
        PrinterColor::Blue => PrinterColor::BoldBlue,
        PrinterColor::Cyan => PrinterColor::BoldCyan,
        other => other,
    }
}
