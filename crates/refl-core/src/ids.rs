//! Record identifier generation.
//!
//! Identifiers are random UUID v4 strings so that concurrent assemblies never
//! collide and re-running an assembly always yields fresh identifiers.

use uuid::Uuid;

/// Generate a new record identifier.
#[must_use]
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Check that a string is a well-formed record identifier.
#[must_use]
pub fn is_record_id(value: &str) -> bool {
    Uuid::parse_str(value).is_ok_and(|id| id.get_version_num() == 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_v4() {
        let ids: HashSet<String> = (0..256).map(|_| new_record_id()).collect();
        assert_eq!(ids.len(), 256);
        assert!(ids.iter().all(|id| is_record_id(id)));
    }

    #[test]
    fn rejects_non_uuid() {
        assert!(!is_record_id("ref-0001"));
        assert!(!is_record_id(""));
    }
}
