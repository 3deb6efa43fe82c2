//! Mount-time configuration.

use std::time::Duration;

use crate::executor::DEFAULT_KEEP_ALIVE;

/// Options recognized when a backend is mounted.
///
/// # Example
///
/// ```rust
/// use anyfs_mount::MountOptions;
/// use std::time::Duration;
///
/// let options = MountOptions::default()
///     .with_read_only(true)
///     .with_keep_alive(Duration::from_secs(5));
/// assert!(options.read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MountOptions {
    /// Wrap the session in a [`ReadOnlyView`](crate::ReadOnlyView).
    pub read_only: bool,
    /// Log every callback at `debug` instead of `trace`.
    pub debug: bool,
    /// How long an idle concurrent worker waits for work before exiting.
    pub keep_alive: Duration,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            debug: false,
            keep_alive: DEFAULT_KEEP_ALIVE,
            thread_name: "anyfs-mount".to_owned(),
        }
    }
}

impl MountOptions {
    /// Set the read-only flag.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the idle keep-alive of concurrent workers.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Parse options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed input or mistyped fields.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
