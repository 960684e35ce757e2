//! Structured error handling and exit codes.

use serde::Serialize;

use crate::duplicates::FinderError;

/// Exit codes for the imgdupe application.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (some images skipped or some copies failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and duplicates were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Partial success: Completed, but some images could not be read or copied.
    PartialSuccess = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "ID000",
            Self::GeneralError => "ID001",
            Self::NoDuplicates => "ID002",
            Self::PartialSuccess => "ID003",
            Self::Interrupted => "ID130",
        }
    }

    /// Exit code for an error that escaped `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<FinderError>())
            .any(|e| matches!(e, FinderError::Interrupted));
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "ID001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::NoDuplicates.as_i32(), 2);
        assert_eq!(ExitCode::PartialSuccess.as_i32(), 3);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_code_prefix() {
        assert_eq!(ExitCode::Success.code_prefix(), "ID000");
        assert_eq!(ExitCode::PartialSuccess.code_prefix(), "ID003");
        assert_eq!(ExitCode::Interrupted.code_prefix(), "ID130");
    }

    #[test]
    fn test_for_error_detects_interrupt_through_context() {
        let err = Err::<(), _>(FinderError::Interrupted)
            .context("scan failed")
            .unwrap_err();
        assert_eq!(ExitCode::for_error(&err), ExitCode::Interrupted);

        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    }

    #[test]
    fn test_structured_error_json() {
        let err = anyhow::anyhow!("boom");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["code"], "ID001");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["message"], "boom");
        assert_eq!(json["interrupted"], false);
    }
}
