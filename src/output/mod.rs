//! Output formatting and display
//!
//! Report lines go to standard output, one per measurement, in both a plain
//! and a colored rendition.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter, OverheadLevel};
pub use self::formatter::{FormattingOptions, OutputFormatter, PlainFormatter, RowData};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}
