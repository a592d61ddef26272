//! Table name grammar: one or more ASCII letters, digits or underscores.

use super::error::{RegistryError, RegistryResult};

/// Check a name against `^[A-Za-z0-9_]+$`
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Validate a table name, returning `InvalidIdentifier` when it fails the grammar
pub fn validate_identifier(name: &str) -> RegistryResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidIdentifier(name.to_string()))
    }
}

/// Quote an identifier for use in engine SQL text.
///
/// Registry names never contain quotes, but column names come from producers
/// and may contain anything.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
