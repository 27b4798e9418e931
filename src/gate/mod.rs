//! Extraction gate: turn staged documents into structured fields, then
//! decide whether the case may proceed automatically.
//!
//! Extraction backends are synchronous and run on a blocking thread
//! with a hard timeout; the gate itself stays async. The decision is a
//! pure function of the extraction result, the confidence threshold and
//! the plausibility checks, so it is testable without any backend.

pub mod plausibility;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DocumentRef, ExtractedFields};
use self::plausibility::PlausibilityCheck;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document could not be read: {0}")]
    Unreadable(String),

    #[error("extraction timed out after {0}s")]
    Timeout(u64),

    #[error("extraction backend error: {0}")]
    Backend(String),

    #[error("cannot reach extraction backend at {0}")]
    Connection(String),

    #[error("unparseable extraction response: {0}")]
    ResponseParsing(String),
}

/// Raw result of one extraction run, before the gate evaluates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub fields: ExtractedFields,
    /// Backend self-assessment in [0.0, 1.0].
    pub confidence: f64,
}

/// Synchronous extraction backend. Implementations may block; the gate
/// wraps calls in `spawn_blocking`.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, documents: &[DocumentRef]) -> Result<Extraction, ExtractionError>;
}

/// Gate verdict for one extraction run.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Confident and plausible: the case may close automatically.
    Proceed { extraction: Extraction },
    /// Needs a human: low confidence or failed plausibility checks.
    NeedsReview {
        extraction: Extraction,
        issues: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub confidence_threshold: f64,
    pub timeout_secs: u64,
    pub checks: Vec<PlausibilityCheck>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            timeout_secs: 120,
            checks: PlausibilityCheck::standard(),
        }
    }
}

pub struct ExtractionGate {
    extractor: Arc<dyn FieldExtractor>,
    config: GateConfig,
}

impl ExtractionGate {
    pub fn new(extractor: Arc<dyn FieldExtractor>, config: GateConfig) -> Self {
        Self { extractor, config }
    }

    /// Run extraction on a blocking thread and evaluate the result.
    ///
    /// A backend that exceeds `timeout_secs` is abandoned; its thread
    /// finishes in the background but the result is discarded.
    pub async fn run(&self, documents: Vec<DocumentRef>) -> Result<GateDecision, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let handle = tokio::task::spawn_blocking(move || extractor.extract(&documents));
        let extraction = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(ExtractionError::Backend(format!(
                    "extraction task panicked: {join_err}"
                )))
            }
            Err(_) => return Err(ExtractionError::Timeout(self.config.timeout_secs)),
        };

        Ok(self.evaluate(extraction))
    }

    /// Apply threshold and plausibility checks to a finished extraction.
    pub fn evaluate(&self, extraction: Extraction) -> GateDecision {
        let mut issues = Vec::new();

        if extraction.confidence < self.config.confidence_threshold {
            issues.push(format!(
                "extraction confidence {:.2} below threshold {:.2}",
                extraction.confidence, self.config.confidence_threshold
            ));
        }

        for check in &self.config.checks {
            if let Some(issue) = check.apply(&extraction.fields) {
                issues.push(issue);
            }
        }

        if issues.is_empty() {
            GateDecision::Proceed { extraction }
        } else {
            tracing::info!(
                confidence = extraction.confidence,
                issues = issues.len(),
                "extraction routed to review"
            );
            GateDecision::NeedsReview { extraction, issues }
        }
    }
}
