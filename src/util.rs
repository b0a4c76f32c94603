//! Shared helpers.

/// Unwrap an optional, logging a message and returning if it is missing.
///
/// Most record lookups can miss legitimately (a sync notification may have
/// removed the record since the UI captured its id) and the right response
/// is to drop the edit, not to panic.
macro_rules! bail {
    ($opt:expr $(,)?) => {
        match $opt {
            Some(val) => val,
            None => {
                log::warn!("[{}:{}] bailed", file!(), line!());
                return;
            }
        }
    };
    ($opt:expr, $($arg:tt)+) => {
        match $opt {
            Some(val) => val,
            None => {
                log::warn!($($arg)+);
                return;
            }
        }
    };
}
