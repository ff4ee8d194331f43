//! Inspection pipeline
//!
//! Runs the detectors over a payload in a fixed order — signature rules,
//! then regex rules, then the semantic fallback — short-circuiting on the
//! first match. Cheap deterministic checks run first so the expensive
//! semantic call only happens for payloads no rule recognizes.

use std::sync::Arc;

use gw_rules::{RegexRuleSet, SignatureRuleSet};
use gw_semantic::{AnalysisVerdict, SemanticAnalyzer};
use tracing::{debug, info, warn};

/// Which detector produced a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    Signature,
    Regex,
    Semantic,
}

/// The pipeline's per-request decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionOutcome {
    /// No detector matched; the request proceeds
    Allowed,
    /// At least one rule matched. `rules` is never empty; the regex stage
    /// can contribute several names for one decision.
    Blocked {
        detector: DetectorKind,
        rules: Vec<String>,
    },
    /// The semantic service could not be consulted and the fail-closed
    /// policy is active. Not an attack incident; surfaced as a
    /// service-unavailable response.
    AnalysisUnavailable,
}

/// The ordered detector chain
pub struct InspectionPipeline {
    signatures: SignatureRuleSet,
    regexes: RegexRuleSet,
    analyzer: Option<Arc<dyn SemanticAnalyzer>>,
    fail_open: bool,
}

impl InspectionPipeline {
    pub fn new(
        signatures: SignatureRuleSet,
        regexes: RegexRuleSet,
        analyzer: Option<Arc<dyn SemanticAnalyzer>>,
        fail_open: bool,
    ) -> Self {
        Self {
            signatures,
            regexes,
            analyzer,
            fail_open,
        }
    }

    /// Inspect a combined payload (request body plus query string) and
    /// return a verdict. Always completes; never propagates detector
    /// failures to the caller.
    pub async fn inspect(&self, payload: &str) -> InspectionOutcome {
        if let Some(rule) = self.signatures.first_match(payload) {
            info!("Signature rule triggered: {}", rule);
            return InspectionOutcome::Blocked {
                detector: DetectorKind::Signature,
                rules: vec![rule.to_string()],
            };
        }

        let matched = self.regexes.matches_all(payload);
        if !matched.is_empty() {
            info!("Regex rule(s) triggered: {}", matched.join(", "));
            return InspectionOutcome::Blocked {
                detector: DetectorKind::Regex,
                rules: matched.into_iter().map(String::from).collect(),
            };
        }

        let Some(analyzer) = &self.analyzer else {
            debug!("No analysis service configured; allowing unmatched payload");
            return InspectionOutcome::Allowed;
        };

        debug!("Payload is unknown; forwarding to the analysis service");
        match analyzer.analyze(payload).await {
            AnalysisVerdict::Malicious {
                detected_pattern, ..
            } => {
                info!(
                    "Analysis service identified payload as malicious: {}",
                    detected_pattern
                );
                InspectionOutcome::Blocked {
                    detector: DetectorKind::Semantic,
                    rules: vec![format!("RAG: {}", detected_pattern)],
                }
            }
            AnalysisVerdict::Benign { .. } => InspectionOutcome::Allowed,
            AnalysisVerdict::Unreachable => {
                if self.fail_open {
                    warn!("Analysis service unreachable; fail-open policy lets the request through");
                    InspectionOutcome::Allowed
                } else {
                    warn!("Analysis service unreachable; failing closed");
                    InspectionOutcome::AnalysisUnavailable
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Analyzer double that counts invocations and returns a fixed verdict
    struct StubAnalyzer {
        verdict: AnalysisVerdict,
        calls: AtomicUsize,
    }

    impl StubAnalyzer {
        fn new(verdict: AnalysisVerdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SemanticAnalyzer for StubAnalyzer {
        async fn analyze(&self, _payload: &str) -> AnalysisVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    fn pipeline_with(
        analyzer: Option<Arc<StubAnalyzer>>,
        fail_open: bool,
    ) -> InspectionPipeline {
        InspectionPipeline::new(
            SignatureRuleSet::builtin(),
            RegexRuleSet::builtin(),
            analyzer.map(|a| a as Arc<dyn SemanticAnalyzer>),
            fail_open,
        )
    }

    #[tokio::test]
    async fn test_signature_match_blocks_without_analysis_call() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Benign {
            reason: String::new(),
        });
        let pipeline = pipeline_with(Some(stub.clone()), false);

        let outcome = pipeline.inspect("' OR 1=1 --").await;
        assert_eq!(
            outcome,
            InspectionOutcome::Blocked {
                detector: DetectorKind::Signature,
                rules: vec!["SQLInjection".to_string()],
            }
        );
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_regex_match_reports_every_rule() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Benign {
            reason: String::new(),
        });
        let pipeline = pipeline_with(Some(stub.clone()), false);

        // Passes the signature set but trips two regex rules.
        let outcome = pipeline
            .inspect(r#"{"$where": "this", "next": "http://169.254.169.254/meta"}"#)
            .await;
        match outcome {
            InspectionOutcome::Blocked { detector, rules } => {
                assert_eq!(detector, DetectorKind::Regex);
                assert_eq!(rules, vec!["NoSQL Injection", "SSRF"]);
            }
            other => panic!("Expected a regex block, got {:?}", other),
        }
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_payload_calls_analysis_exactly_once() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Benign {
            reason: "Nothing similar found.".to_string(),
        });
        let pipeline = pipeline_with(Some(stub.clone()), false);

        let outcome = pipeline.inspect("hello world").await;
        assert_eq!(outcome, InspectionOutcome::Allowed);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malicious_verdict_blocks_with_rag_rule_name() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Malicious {
            detected_pattern: "Obfuscated SQLi".to_string(),
            reason: String::new(),
        });
        let pipeline = pipeline_with(Some(stub), false);

        let outcome = pipeline.inspect("hello world").await;
        assert_eq!(
            outcome,
            InspectionOutcome::Blocked {
                detector: DetectorKind::Semantic,
                rules: vec!["RAG: Obfuscated SQLi".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_fails_closed_by_default() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Unreachable);
        let pipeline = pipeline_with(Some(stub), false);

        let outcome = pipeline.inspect("hello world").await;
        assert_eq!(outcome, InspectionOutcome::AnalysisUnavailable);
    }

    #[tokio::test]
    async fn test_unreachable_with_fail_open_allows() {
        let stub = StubAnalyzer::new(AnalysisVerdict::Unreachable);
        let pipeline = pipeline_with(Some(stub), true);

        let outcome = pipeline.inspect("hello world").await;
        assert_eq!(outcome, InspectionOutcome::Allowed);
    }

    #[tokio::test]
    async fn test_no_analyzer_degrades_to_rule_sets_only() {
        let pipeline = pipeline_with(None, false);

        assert_eq!(
            pipeline.inspect("hello world").await,
            InspectionOutcome::Allowed
        );
        match pipeline.inspect("<script>alert(1)</script>").await {
            InspectionOutcome::Blocked { rules, .. } => {
                assert!(!rules.is_empty());
            }
            other => panic!("Expected a block, got {:?}", other),
        }
    }
}
