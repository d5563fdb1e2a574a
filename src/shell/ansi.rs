//! Terminal escape sequences used by the interactive shell.

pub const RESET: &str = "\x1b[0m";
pub const FG_BRIGHT_GREEN: &str = "\x1b[92m";
pub const FG_BRIGHT_WHITE: &str = "\x1b[97m";

/// Clear the whole screen, then move the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J";
pub const CURSOR_HOME: &str = "\x1b[H";
