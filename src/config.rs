//! # Process tree configuration.
//!
//! Provides [`Config`], the settings shared by every process of one tree.
//!
//! A config is given once, to the root ([`Process::start_with_config`](crate::Process::start_with_config));
//! every descendant inherits the same instance.
//!
//! ## Sentinel values
//! - `stall_warning = 0s` → no stall warning

use std::time::Duration;

/// Settings shared by a process tree.
///
/// ## Field semantics
/// - `stall_warning`: teardown duration after which a warning is logged (`0s` = never)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling sentinel
/// checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long a process may spend closing before a warning is logged.
    ///
    /// Closing is never forced: a hung `on_closed` or a work body that ignores
    /// its closing signal stalls the tree. This only makes the stall visible.
    pub stall_warning: Duration,
}

impl Config {
    /// Returns the stall warning threshold as an `Option`.
    ///
    /// - `None` → no warning
    /// - `Some(d)` → warn once when a teardown exceeds `d`
    #[inline]
    pub fn stall_warning_after(&self) -> Option<Duration> {
        if self.stall_warning == Duration::ZERO {
            None
        } else {
            Some(self.stall_warning)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `stall_warning = 30s`
    fn default() -> Self {
        Self {
            stall_warning: Duration::from_secs(30),
        }
    }
}
