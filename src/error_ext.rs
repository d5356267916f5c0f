//! Logging conversions from `Result` to `Option`.
//!
//! Most lookups in this server end in "nothing found" rather than an error
//! reported to the editor. These helpers keep the reason in the log.

use tracing::{debug, warn};

pub trait ResultExt<T, E: std::fmt::Display> {
    /// Convert to Option, logging the error at warn level if Err.
    ///
    /// For failures a user would want to know about (bad config, unreadable root).
    fn ok_warn(self, context: &str) -> Option<T>;

    /// Convert to Option, logging the error at debug level if Err.
    ///
    /// For failures that are routine while the user is typing.
    fn ok_debug(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn ok_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(context = %context, error = %e, "Operation failed");
                None
            }
        }
    }

    fn ok_debug(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(context = %context, error = %e, "Operation yielded nothing");
                None
            }
        }
    }
}
