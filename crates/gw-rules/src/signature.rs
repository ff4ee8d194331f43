//! Ordered signature rule set
//!
//! Each rule is a named pure predicate over the combined payload text.
//! Evaluation order is the insertion order of the list and is stable across
//! runs; the first matching rule is the one attributed to an incident, so
//! the ordering is part of the contract, not an implementation detail.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

/// A named boolean predicate over the payload text
#[derive(Clone, Copy)]
pub struct SignatureRule {
    pub name: &'static str,
    pub check: fn(&str) -> bool,
}

/// An ordered collection of signature rules
pub struct SignatureRuleSet {
    rules: Vec<SignatureRule>,
}

impl SignatureRuleSet {
    pub fn new(rules: Vec<SignatureRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule families: injection, scripting, traversal and
    /// friends, in the order they are attributed.
    pub fn builtin() -> Self {
        Self::new(vec![
            SignatureRule {
                name: "SQLInjection",
                check: has_sql_injection,
            },
            SignatureRule {
                name: "XSS",
                check: has_xss,
            },
            SignatureRule {
                name: "PathTraversal",
                check: has_path_traversal,
            },
            SignatureRule {
                name: "CommandInjection",
                check: has_command_injection,
            },
            SignatureRule {
                name: "TemplateInjection",
                check: has_template_injection,
            },
            SignatureRule {
                name: "LDAPInjection",
                check: has_ldap_injection,
            },
            SignatureRule {
                name: "CRLFInjection",
                check: has_crlf_injection,
            },
        ])
    }

    /// Evaluate the rules in order and return the first matching rule name.
    ///
    /// A panicking predicate is logged and treated as a non-match; the
    /// remaining rules still run.
    pub fn first_match(&self, payload: &str) -> Option<&'static str> {
        for rule in &self.rules {
            match catch_unwind(AssertUnwindSafe(|| (rule.check)(payload))) {
                Ok(true) => return Some(rule.name),
                Ok(false) => {}
                Err(_) => {
                    error!("Signature rule {} failed to evaluate; skipping it", rule.name);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn has_sql_injection(payload: &str) -> bool {
    let p = payload.to_lowercase();
    [
        "' or 1=1",
        "\" or 1=1",
        "or 1=1 --",
        "union select",
        "union all select",
        "drop table",
        "insert into",
        "xp_cmdshell",
        "'; --",
    ]
    .iter()
    .any(|pat| p.contains(pat))
}

fn has_xss(payload: &str) -> bool {
    let p = payload.to_lowercase();
    [
        "<script",
        "javascript:",
        "onerror=",
        "onload=",
        "<iframe",
        "document.cookie",
    ]
    .iter()
    .any(|pat| p.contains(pat))
}

fn has_path_traversal(payload: &str) -> bool {
    let p = payload.to_lowercase();
    ["../", "..\\", "%2e%2e%2f", "%2e%2e/", "/etc/passwd", "c:\\windows"]
        .iter()
        .any(|pat| p.contains(pat))
}

fn has_command_injection(payload: &str) -> bool {
    let p = payload.to_lowercase();
    ["$(", "`id`", "; ls", "; cat ", "| nc ", "rm -rf", "/bin/sh", "/bin/bash"]
        .iter()
        .any(|pat| p.contains(pat))
}

fn has_template_injection(payload: &str) -> bool {
    ["{{", "${", "<%"].iter().any(|pat| payload.contains(pat))
}

fn has_ldap_injection(payload: &str) -> bool {
    [")(|", ")(&", "*)(", "*))%00"]
        .iter()
        .any(|pat| payload.contains(pat))
}

fn has_crlf_injection(payload: &str) -> bool {
    let p = payload.to_lowercase();
    ["%0d%0a", "%0a%0d", "\r\nset-cookie", "\r\nlocation:"]
        .iter()
        .any(|pat| p.contains(pat))
}
