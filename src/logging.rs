//! Logging facade.
//!
//! The navigator logs through a small set of macros that forward to either
//! the [`log`](https://docs.rs/log) or the [`tracing`](https://docs.rs/tracing)
//! crate. Which one is used is decided by Cargo features; enable at most one.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! Every record is emitted under the [`TARGET`] target so applications can
//! filter navigator output independently (`RUST_LOG=view_navigator=debug`).
//!
//! Level conventions used throughout the crate:
//!
//! - `info`: route registration, committed navigations.
//! - `debug`: pipeline phases, dialog stack changes, evictions.
//! - `trace`: individual lifecycle callbacks, cache hits and misses.
//! - `warn`: cancelled or superseded navigations, ignored callback answers.
//! - `error`: configuration failures, redirect loops, callback errors.

/// Log target shared by every navigator record.
pub const TARGET: &str = "view_navigator";

/// Emit a **trace**-level record under the navigator target.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!(target: $crate::logging::TARGET, $($arg)*);
    };
}

/// Emit a **debug**-level record under the navigator target.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!(target: $crate::logging::TARGET, $($arg)*);
    };
}

/// Emit an **info**-level record under the navigator target.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::info!(target: $crate::logging::TARGET, $($arg)*);
    };
}

/// Emit a **warn**-level record under the navigator target.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!(target: $crate::logging::TARGET, $($arg)*);
    };
}

/// Emit an **error**-level record under the navigator target.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!(target: $crate::logging::TARGET, $($arg)*);
        #[cfg(feature = "log")]
        ::log::error!(target: $crate::logging::TARGET, $($arg)*);
    };
}
