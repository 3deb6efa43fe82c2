//! Timestamp updates.

use std::path::Path;
use std::time::SystemTime;

use crate::FsError;

/// Timestamp updates (`utimens`).
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsTimes`.
pub trait FsTimes: Send + Sync {
    /// Set access and/or modification time. `None` leaves that time as is.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn set_times(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<(), FsError>;
}
