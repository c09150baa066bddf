/*
 * Error type shared by the registry, the hook installer and the Win32 binding.
 * A missing key is never an error here; lookups report it as `None`.
 */
use crate::types::WindowHandle;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Growing the registry's backing storage failed. The table is unchanged.
    AllocationFailed(String),
    InvalidHandle(String),
    /// A hook is already installed for this window.
    AlreadyInstalled(WindowHandle),
    OperationFailed(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::AllocationFailed(msg) => write!(f, "Allocation failed: {msg}"),
            PlatformError::InvalidHandle(msg) => write!(f, "Invalid handle: {msg}"),
            PlatformError::AlreadyInstalled(handle) => {
                write!(f, "Window {handle:?} already has a hook installed")
            }
            PlatformError::OperationFailed(msg) => write!(f, "Operation failed: {msg}"),
        }
    }
}

impl std::error::Error for PlatformError {}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        PlatformError::OperationFailed(format!("Win32 call failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_window() {
        let err = PlatformError::AlreadyInstalled(WindowHandle(0x42));
        assert_eq!(
            err.to_string(),
            "Window WindowHandle(66) already has a hook installed"
        );
    }
}
