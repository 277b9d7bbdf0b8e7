//! Exit code constants and error kind mapping for apprank.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure (storage, I/O) |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `VALIDATION` | Request or LLM response failed validation |
//! | 4 | `NOT_FOUND` | Referenced entity does not exist |
//! | 5 | `CONFLICT` | Uniqueness violation or protected reference |
//! | 70 | `PROVIDER_FAILURE` | LLM provider call failed |

use crate::types::ErrorKind;

/// Exit codes matching the documented exit code table.
///
/// Codes 2 through 5 are client errors: the request was wrong and retrying it
/// unchanged will fail again. Codes 1 and 70 are server-side failures.
///
/// ```rust
/// use apprank_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::CONFLICT.as_i32(), 5);
/// assert!(ExitCode::NOT_FOUND.is_client_error());
/// assert!(!ExitCode::PROVIDER_FAILURE.is_client_error());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - storage, I/O or other unexpected failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Validation error - missing models/features or malformed LLM output
    pub const VALIDATION: ExitCode = ExitCode(3);

    /// A referenced entity does not exist
    pub const NOT_FOUND: ExitCode = ExitCode(4);

    /// Uniqueness violation or delete blocked by dependents
    pub const CONFLICT: ExitCode = ExitCode(5);

    /// Provider failure - the LLM call failed
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self.0, 2..=5)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl From<ErrorKind> for ExitCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::CliArgs => ExitCode::CLI_ARGS,
            ErrorKind::Validation => ExitCode::VALIDATION,
            ErrorKind::NotFound => ExitCode::NOT_FOUND,
            ErrorKind::Conflict => ExitCode::CONFLICT,
            ErrorKind::ProviderFailure => ExitCode::PROVIDER_FAILURE,
            ErrorKind::Internal => ExitCode::INTERNAL,
        }
    }
}
