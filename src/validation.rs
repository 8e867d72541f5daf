//! Instance name validation.

use crate::{PgleaseError, Result};

/// Maximum allowed length for instance names.
const MAX_NAME_LENGTH: usize = 63;

/// Validates a database instance name before it is interpolated into a
/// control-plane URL path or credential request body.
///
/// Rejects empty names, names over 63 characters, and anything outside
/// alphanumerics plus `-`, `_`, and `.`.
///
/// # Errors
///
/// Returns [`PgleaseError::InvalidInstanceName`] if validation fails.
///
/// # Example
///
/// ```
/// use pglease::validation::validate_instance_name;
///
/// assert!(validate_instance_name("prod-db-1").is_ok());
/// assert!(validate_instance_name("analytics.replica").is_ok());
///
/// assert!(validate_instance_name("").is_err());
/// assert!(validate_instance_name("db/../../admin").is_err());
/// ```
pub fn validate_instance_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PgleaseError::InvalidInstanceName(
            "name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(PgleaseError::InvalidInstanceName(format!(
            "name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(PgleaseError::InvalidInstanceName(format!(
            "name contains disallowed character {:?}",
            c
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_instance_name("prod-db-1").is_ok());
        assert!(validate_instance_name("analytics.replica").is_ok());
        assert!(validate_instance_name("db_01").is_ok());
        assert!(validate_instance_name("A").is_ok());
    }

    #[test]
    fn test_empty_name() {
        let result = validate_instance_name("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_too_long() {
        let long_name = "a".repeat(64);
        let result = validate_instance_name(&long_name);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_path_traversal_rejected() {
        for name in ["db/../../admin", "db name", "db\n1", "db;drop", "db%2e"] {
            let result = validate_instance_name(name);
            assert!(result.is_err(), "expected {:?} to fail validation", name);
        }
    }
}
