//! Output helpers: JSON persistence and console rendering.

pub mod file_handler;
pub mod printer;

pub use file_handler::FileHandler;
pub use printer::{ColoredText, Printer, PrinterColor};
