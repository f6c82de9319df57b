//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Each module that logs declares the flag once and imports the macros from
//! the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("tracker accepted heading {:.1}", degrees);
//! ```
//! Flip the flag to `false` to silence a noisy module (the sensor loop is the
//! usual one) without touching `RUST_LOG`.

/// Per-sample chatter. Visible with `SPOTQUEST_DEBUG=1` or `RUST_LOG=debug`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Lifecycle events: missions started, attempts decided, models loaded.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Recoverable problems that become a failed attempt or a dropped sample.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
