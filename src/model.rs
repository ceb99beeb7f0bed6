use serde::{Deserialize, Serialize};

/// The identity the user asserts; the document must corroborate it.
///
/// Immutable input. At least one field must be present or verification is
/// refused up front (there would be nothing to match against).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub email: Option<String>,
    pub declared_full_name: Option<String>,
    pub student_id: Option<String>,
}

impl IdentityClaim {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.declared_full_name.is_none() && self.student_id.is_none()
    }
}

/// Raw output of one recognition run over one preprocessed image.
///
/// `engine_confidence` is the engine's self-assessed quality (0–100); it says
/// nothing about whether the extracted fields match the claim. `None` means
/// the engine produced no confidence at all (e.g. zero words recognized).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub raw_text: String,
    pub engine_confidence: Option<f32>,
    pub word_count: usize,
}

/// Where the candidate name used for matching came from.
///
/// The email-derived name ranks above the free-text declared name because the
/// user cannot type arbitrary text into their institutional email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    ClaimName,
    EmailDerived,
}

/// Per-field match verdicts against the claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatches {
    pub student_id: bool,
    pub name: bool,
    pub institution: bool,
}

/// Fields recovered from the OCR text, each scored against the claim.
///
/// Pure function of `(raw_text, claim)`; the string fields hold the matched
/// substrings for audit display, not the full OCR text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedIdentity {
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub name_source: Option<NameSource>,
    pub institution: Option<String>,
    pub matches: FieldMatches,
}

/// Terminal decision for one verification attempt.
///
/// The pipeline itself only ever emits `AutoApproved` or `PendingReview`;
/// `RejectedNoSignal` belongs to the admin review vocabulary consumed
/// downstream (final rejection is a human decision, not ours).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AutoApproved,
    PendingReview,
    RejectedNoSignal,
}

/// One per attempted preprocessing variant, kept for audit/debugging.
///
/// Variants whose recognition failed are still recorded (confidence 0,
/// `error` set) — never silently dropped.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptTrace {
    pub variant: &'static str,
    pub confidence: u8,
    pub text_length: usize,
    pub match_summary: FieldMatches,
    pub selection_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The pipeline's sole return value. Stateless; nothing persists beyond one
/// invocation. `failure_reasons` is empty exactly when `decision` is
/// `AutoApproved`. `trace` is for admin tooling only, never end users.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub confidence: u8,
    pub decision: Decision,
    pub extracted: ExtractedIdentity,
    pub failure_reasons: Vec<String>,
    pub trace: Vec<AttemptTrace>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_claim_detection() {
        assert!(IdentityClaim::default().is_empty());

        let claim = IdentityClaim {
            email: Some("a@b.edu".to_string()),
            ..Default::default()
        };
        assert!(!claim.is_empty());
    }

    #[test]
    fn test_decision_serializes_snake_case() {
        let json = serde_json::to_string(&Decision::AutoApproved).unwrap();
        assert_eq!(json, "\"auto_approved\"");
        let json = serde_json::to_string(&Decision::PendingReview).unwrap();
        assert_eq!(json, "\"pending_review\"");
        let json = serde_json::to_string(&Decision::RejectedNoSignal).unwrap();
        assert_eq!(json, "\"rejected_no_signal\"");
    }
}
