//! CLI-specific error types and exit code mapping

use scangate_core::error::ScangateError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes a CI step can act on.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Thresholds were crossed and the build should be marked unstable.
    #[error("build unstable: {0}")]
    Unstable(String),

    /// Thresholds were crossed and the build should fail.
    #[error("build failed: {0}")]
    Failure(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from scangate-core.
    #[error("{0}")]
    Core(#[from] ScangateError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 4    | Thresholds crossed, build unstable    |
    /// | 5    | Thresholds crossed, build failure     |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ScangateError::Config(_)) => 2,
            Self::Unstable(_) => 4,
            Self::Failure(_) => 5,
            Self::Io(_) | Self::Core(ScangateError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scangate_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::Core(ScangateError::Config(ConfigError::FileNotFound {
            path: "scangate.toml".to_owned(),
        }));
        assert_eq!(
            err.exit_code(),
            2,
            "config errors from core should also return exit code 2"
        );
    }

    #[test]
    fn test_exit_code_unstable_and_failure() {
        assert_eq!(CliError::Unstable("1 violation".to_owned()).exit_code(), 4);
        assert_eq!(CliError::Failure("1 violation".to_owned()).exit_code(), 5);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);

        let core_io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(CliError::Core(ScangateError::Io(core_io)).exit_code(), 10);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        assert_eq!(CliError::JsonSerialize(json_err).exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_threshold_outcomes() {
        let err = CliError::Failure("2 threshold violations".to_owned());
        assert_eq!(err.to_string(), "build failed: 2 threshold violations");
        let err = CliError::Unstable("1 threshold violation".to_owned());
        assert_eq!(err.to_string(), "build unstable: 1 threshold violation");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }

    #[test]
    fn test_from_core_error() {
        let core_err = ScangateError::Config(ConfigError::ParseFailed {
            reason: "bad".to_owned(),
        });
        let cli_err: CliError = core_err.into();
        assert!(matches!(cli_err, CliError::Core(_)));
    }
}
