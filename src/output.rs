//! Console formatting helpers
//!
//! Operators follow the agent by reading its log, so each phase is bracketed
//! with separator lines. None of this affects behaviour.

use tracing::info;

/// Width of the separator line
pub const SEPARATOR_WIDTH: usize = 20;

/// The decorative separator line
pub fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

/// Log a separator line
pub fn print_separator() {
    info!("{}", separator());
}

/// Log `title`, then every line of `body` between two separators
pub fn print_block(title: &str, body: &str) {
    info!("{}", title);
    print_separator();
    for line in body.lines() {
        info!("{}", line);
    }
    print_separator();
}
