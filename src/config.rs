// ABOUTME: Configuration and constants for the interpreter
// This module contains version info, the welcome banner, and heap sizing

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WELCOME_MESSAGE: &str = "Welcome to nanolisp.";
pub const WELCOME_SUBTITLE: &str = "An embeddable Scheme-flavored Lisp with a cell heap";

/// Total bytes of cell storage the default heap is sized to fit.
pub const HEAP_BYTES: usize = 64 * 1024;

/// Integers in `[0, SMALL_INTEGER_CACHE_SIZE)` are preallocated and unique.
pub const SMALL_INTEGER_CACHE_SIZE: usize = 32;

/// File the interactive driver reads line history from at startup and
/// writes it back to on normal exit.
pub const HISTORY_FILE: &str = "./.history";
