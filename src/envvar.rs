// Environment variable composition helpers
//
// Every provisioner injects flags into variables the build's own tools may
// already populate (MAVEN_OPTS, NODE_OPTIONS, GOFLAGS, ...). These helpers
// splice a new segment in without discarding what was already there. Pure
// functions; the input map is never mutated.

use std::collections::HashMap;

/// `segment` followed by the existing value, space-separated.
pub fn prepend(env: &HashMap<String, String>, key: &str, segment: &str) -> String {
    match env.get(key) {
        Some(existing) if !existing.is_empty() => format!("{segment} {existing}"),
        _ => segment.to_string(),
    }
}

/// The existing value followed by `segment`, space-separated.
pub fn append(env: &HashMap<String, String>, key: &str, segment: &str) -> String {
    match env.get(key) {
        Some(existing) if !existing.is_empty() => format!("{existing} {segment}"),
        _ => segment.to_string(),
    }
}

/// Like [`prepend`], but joined with the platform path-list separator, for
/// PYTHONPATH-style variables.
pub fn prepend_path(env: &HashMap<String, String>, key: &str, path: &str) -> String {
    let separator = if cfg!(windows) { ";" } else { ":" };
    match env.get(key) {
        Some(existing) if !existing.is_empty() => format!("{path}{separator}{existing}"),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prepend_missing_key() {
        assert_eq!(prepend(&env(&[]), "K", "A"), "A");
    }

    #[test]
    fn test_prepend_existing_value() {
        assert_eq!(prepend(&env(&[("K", "B")]), "K", "A"), "A B");
    }

    #[test]
    fn test_append_existing_value() {
        assert_eq!(append(&env(&[("K", "B")]), "K", "A"), "B A");
    }

    #[test]
    fn test_append_missing_key() {
        assert_eq!(append(&env(&[]), "K", "A"), "A");
    }

    #[test]
    fn test_empty_existing_value_is_ignored() {
        assert_eq!(prepend(&env(&[("K", "")]), "K", "A"), "A");
        assert_eq!(append(&env(&[("K", "")]), "K", "A"), "A");
    }

    #[test]
    fn test_input_map_is_untouched() {
        let input = env(&[("K", "B")]);
        let _ = prepend(&input, "K", "A");
        assert_eq!(input.get("K").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_prepend_path_uses_platform_separator() {
        let separator = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(
            prepend_path(&env(&[("PYTHONPATH", "/existing")]), "PYTHONPATH", "/new"),
            format!("/new{separator}/existing")
        );
        assert_eq!(prepend_path(&env(&[]), "PYTHONPATH", "/new"), "/new");
    }
}
