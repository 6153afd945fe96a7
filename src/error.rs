//! Application error type.
//!
//! The profile core never fails; everything that can go wrong at the edges
//! (arguments, files, physically impossible requests) becomes an [`AppError`]
//! whose exit code tells scripts what kind of problem it was:
//!
//! - 2: input or IO problem (bad arguments, unreadable/unwritable files, invalid JSON)
//! - 3: physically invalid request
//! - 4: non-finite output

/// Exit code for bad arguments and IO failures.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for requests that cannot describe a physical profile.
pub const EXIT_INVALID_REQUEST: u8 = 3;
/// Exit code for profiles that produced NaN or infinite densities.
pub const EXIT_NON_FINITE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_REQUEST, message)
    }

    pub fn non_finite(message: impl Into<String>) -> Self {
        Self::new(EXIT_NON_FINITE, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
