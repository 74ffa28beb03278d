//! Service Module
//!
//! Business logic layer for the server.
//! Services orchestrate between repositories and contain domain logic.

pub mod cancel;
pub mod log;
pub mod log_buffer;
pub mod retention;
pub mod run;
pub mod stream;

// Re-export for convenience
pub use cancel::CancellationService;
pub use log::LogService;
pub use log_buffer::LogBuffer;
pub use run::RunService;
pub use stream::StreamSettings;

const MAX_RUN_ID_LENGTH: usize = 128;

/// Routes and the CLI use this name for the newest run
const RESERVED_RUN_ID: &str = "latest";

/// Checks that a run ID can safely be used as a blob key segment
pub fn validate_run_id(run_id: &str) -> std::result::Result<(), String> {
    if run_id.is_empty() {
        return Err("Run ID cannot be empty".to_string());
    }

    if run_id.len() > MAX_RUN_ID_LENGTH {
        return Err(format!(
            "Run ID too long (max: {} chars)",
            MAX_RUN_ID_LENGTH
        ));
    }

    if run_id == RESERVED_RUN_ID {
        return Err(format!("Run ID '{}' is reserved", RESERVED_RUN_ID));
    }

    if run_id.contains("..")
        || !run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(format!("Invalid run ID: {}", run_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_run_id_valid() {
        assert!(validate_run_id("r1").is_ok());
        assert!(validate_run_id("2025-01-01_nightly.3").is_ok());
        assert!(validate_run_id("0b6f6a1e-8f0e-4c55-9a55-3d1f0f6a2b11").is_ok());
    }

    #[test]
    fn test_validate_run_id_invalid() {
        assert!(validate_run_id("").is_err());
        assert!(validate_run_id("../etc").is_err());
        assert!(validate_run_id("a/b").is_err());
        assert!(validate_run_id("with space").is_err());
        assert!(validate_run_id("latest").is_err());
        assert!(validate_run_id(&"x".repeat(129)).is_err());
    }
}
