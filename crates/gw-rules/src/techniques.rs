//! Static technique mapping tables
//!
//! Kept as data rather than code so the mappings can be extended without
//! touching the pipeline or the recorder.

/// Maps a keyword found in a rule name to the technique recorded with an
/// incident. Matching is a case-insensitive substring search over the rule
/// name; the first entry that matches wins.
pub struct KeywordTechnique {
    pub keyword: &'static str,
    pub technique_id: &'static str,
    pub technique_name: &'static str,
    pub description: &'static str,
}

pub const KEYWORD_TECHNIQUES: &[KeywordTechnique] = &[
    KeywordTechnique {
        keyword: "SQL",
        technique_id: "T1190",
        technique_name: "Exploit Public-Facing Application",
        description: "SQL Injection attempt detected.",
    },
    KeywordTechnique {
        keyword: "XSS",
        technique_id: "T1059.007",
        technique_name: "Cross-Site Scripting (XSS)",
        description: "Potential XSS attack detected.",
    },
];

/// Find the technique for a rule name, if any.
pub fn technique_for_rule(rule: &str) -> Option<&'static KeywordTechnique> {
    let upper = rule.to_uppercase();
    KEYWORD_TECHNIQUES
        .iter()
        .find(|entry| upper.contains(entry.keyword))
}

/// Maps an exact rule name to its technique id and tactic for the dashboard
/// roll-up.
pub struct RuleTactic {
    pub rule: &'static str,
    pub technique_id: &'static str,
    pub tactic: &'static str,
}

pub const RULE_TACTICS: &[RuleTactic] = &[
    RuleTactic {
        rule: "SQL Injection",
        technique_id: "T1190",
        tactic: "Execution",
    },
    RuleTactic {
        rule: "XSS",
        technique_id: "T1059.007",
        tactic: "Execution",
    },
    RuleTactic {
        rule: "Path Traversal",
        technique_id: "T1083",
        tactic: "Discovery",
    },
    RuleTactic {
        rule: "Brute Force",
        technique_id: "T1110",
        tactic: "Credential Access",
    },
];

/// Technique id and tactic for a rule name; unmapped rules get the
/// `("Unknown", "Unmapped")` sentinel pair.
pub fn tactic_for_rule(rule: &str) -> (&'static str, &'static str) {
    RULE_TACTICS
        .iter()
        .find(|entry| entry.rule == rule)
        .map(|entry| (entry.technique_id, entry.tactic))
        .unwrap_or(("Unknown", "Unmapped"))
}
