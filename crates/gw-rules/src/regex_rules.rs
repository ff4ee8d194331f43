//! Compiled regex rule set
//!
//! Named patterns compiled into a single `RegexSet` with parallel metadata.
//! Unlike the signature set this detector reports every matching rule:
//! independent attack patterns can co-occur in one payload and each gets
//! its own incident.

use regex::RegexSet;
use tracing::warn;

/// A set of named regular-expression rules
pub struct RegexRuleSet {
    set: RegexSet,
    names: Vec<String>,
}

impl RegexRuleSet {
    /// Compile `(name, pattern)` pairs into a rule set.
    ///
    /// Patterns that fail to compile are logged and dropped; the rest of
    /// the set still works.
    pub fn compile(rules: &[(&str, &str)]) -> Self {
        let mut names = Vec::new();
        let mut patterns = Vec::new();

        for (name, pattern) in rules {
            match regex::Regex::new(pattern) {
                Ok(_) => {
                    names.push((*name).to_string());
                    patterns.push((*pattern).to_string());
                }
                Err(e) => {
                    warn!("Skipping invalid regex pattern for rule '{}': {}", name, e);
                }
            }
        }

        // Every pattern compiled individually, so the set compiles too.
        let set = RegexSet::new(&patterns).unwrap_or_else(|e| {
            warn!("Failed to compile regex set: {}", e);
            RegexSet::empty()
        });

        Self { set, names }
    }

    /// The built-in regex rules, matched against body plus query string.
    pub fn builtin() -> Self {
        Self::compile(&[
            (
                "SQL Injection",
                r"(?i)(\bunion\b\s+(all\s+)?\bselect\b|\bselect\b.+\bfrom\b|\bor\b\s+\d+\s*=\s*\d+|sleep\s*\(\s*\d+\s*\))",
            ),
            (
                "XSS",
                r#"(?i)(<\s*script\b|\bon\w+\s*=\s*['"]|javascript\s*:)"#,
            ),
            ("Path Traversal", r"(\.\./|\.\.\\|%2e%2e%2f)"),
            (
                "Command Injection",
                r"(?i)(;\s*(ls|cat|id|whoami)\b|\|\s*(nc|curl|wget)\b|&&\s*(rm|chmod)\b)",
            ),
            (
                "NoSQL Injection",
                r#"(?i)(\$where\b|\$ne\b|\$gt\b|\$regex\b)"#,
            ),
            (
                "SSRF",
                r"(?i)(https?://(127\.0\.0\.1|localhost|169\.254\.169\.254|0\.0\.0\.0))",
            ),
        ])
    }

    /// Return the names of every rule whose pattern matches, in insertion
    /// order. No match yields an empty vec.
    pub fn matches_all(&self, payload: &str) -> Vec<&str> {
        self.set
            .matches(payload)
            .into_iter()
            .filter_map(|idx| self.names.get(idx).map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_match() {
        let rules = RegexRuleSet::builtin();
        let matched = rules.matches_all("q=1 UNION SELECT name FROM sqlite_master");
        assert_eq!(matched, vec!["SQL Injection"]);
    }

    #[test]
    fn test_multiple_matches_reported_in_insertion_order() {
        let rules = RegexRuleSet::builtin();
        let matched = rules.matches_all("<script>fetch('http://127.0.0.1/x')</script>");
        assert_eq!(matched, vec!["XSS", "SSRF"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let rules = RegexRuleSet::builtin();
        assert!(rules.matches_all("perfectly ordinary request body").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let rules = RegexRuleSet::compile(&[
            ("Broken", r"(unclosed"),
            ("Working", r"attack"),
        ]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.matches_all("an attack string"), vec!["Working"]);
    }

    #[test]
    fn test_empty_set() {
        let rules = RegexRuleSet::compile(&[]);
        assert!(rules.is_empty());
        assert!(rules.matches_all("anything").is_empty());
    }

    #[test]
    fn test_case_insensitive_sql() {
        let rules = RegexRuleSet::builtin();
        assert_eq!(
            rules.matches_all("uNiOn SeLeCt password"),
            vec!["SQL Injection"]
        );
    }
}
