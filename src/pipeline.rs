use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::VerifyError;
use crate::extract::{self, MatchConfig};
use crate::fuse::{self, FusionWeights};
use crate::model::{
    AttemptTrace, Decision, ExtractedIdentity, FieldMatches, IdentityClaim, VerificationOutcome,
};
use crate::ocr::{TesseractEngine, TextRecognizer};
use crate::preprocess;

/// Selection-score weight on the fused confidence.
const SELECT_CONFIDENCE_WEIGHT: f32 = 0.4;
/// Selection-score weight on the text-length quality proxy.
const SELECT_TEXT_WEIGHT: f32 = 0.2;
/// Selection-score weight on the field-match score.
const SELECT_MATCH_WEIGHT: f32 = 0.4;
/// Text length is divided by 10 and capped here before weighting.
const TEXT_LENGTH_CAP: f32 = 20.0;

/// Pipeline configuration. Consumed, not owned: the auto-approval threshold
/// ultimately belongs to the calling service; this is its default home.
#[derive(Debug, Clone, Default)]
pub struct VerifyConfig {
    pub approval_threshold: Threshold,
    pub weights: FusionWeights,
    pub matching: MatchConfig,
}

/// Auto-approval confidence threshold with the documented default of 70.
#[derive(Debug, Clone, Copy)]
pub struct Threshold(pub u8);

impl Default for Threshold {
    fn default() -> Self {
        Threshold(70)
    }
}

/// The verification pipeline: runs every preprocessing variant through the
/// recognition engine, scores each attempt, and returns the best one.
///
/// Stateless across invocations; each call is independent and idempotent
/// given identical inputs and a deterministic engine.
pub struct Verifier<E: TextRecognizer = TesseractEngine> {
    engine: E,
    config: VerifyConfig,
}

impl Verifier<TesseractEngine> {
    pub fn new() -> Self {
        Self::with_engine(TesseractEngine::new())
    }
}

impl Default for Verifier<TesseractEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TextRecognizer> Verifier<E> {
    pub fn with_engine(engine: E) -> Self {
        Self { engine, config: VerifyConfig::default() }
    }

    pub fn with_config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    /// Verifies a document image on disk against the claim.
    ///
    /// Only pre-flight problems (unreadable image, empty claim) surface as
    /// errors; every recognition-side failure degrades to an ordinary
    /// outcome so callers never special-case a broken pipeline versus a
    /// low-confidence document.
    pub fn verify(
        &self,
        path: &Path,
        claim: &IdentityClaim,
    ) -> Result<VerificationOutcome, VerifyError> {
        if claim.is_empty() {
            return Err(VerifyError::EmptyClaim);
        }
        let image = image::open(path).map_err(|e| VerifyError::InputNotFound {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(self.run(&image, claim))
    }

    /// Same as [`verify`](Self::verify) for an in-memory image buffer.
    pub fn verify_bytes(
        &self,
        bytes: &[u8],
        claim: &IdentityClaim,
    ) -> Result<VerificationOutcome, VerifyError> {
        if claim.is_empty() {
            return Err(VerifyError::EmptyClaim);
        }
        let image = image::load_from_memory(bytes).map_err(|e| VerifyError::InputNotFound {
            path: "<memory>".into(),
            message: e.to_string(),
        })?;
        Ok(self.run(&image, claim))
    }

    /// One attempt per catalog variant, isolate-and-continue: a variant's
    /// recognition error becomes a zero-score trace entry, never an abort.
    fn run(&self, image: &DynamicImage, claim: &IdentityClaim) -> VerificationOutcome {
        let mut trace: Vec<AttemptTrace> = Vec::with_capacity(preprocess::catalog().len());
        let mut best: Option<BestAttempt> = None;

        for variant in preprocess::catalog() {
            // A failed transform falls back to the untransformed image for
            // this variant; only recognition decides the attempt's fate.
            let transformed = match preprocess::apply(image, variant) {
                Ok(img) => img,
                Err(e) => {
                    warn!("{e}; recognizing untransformed image instead");
                    image.clone()
                }
            };

            match self.engine.recognize(&transformed) {
                Err(e) => {
                    debug!("variant {}: recognition failed: {e}", variant.name);
                    trace.push(AttemptTrace {
                        variant: variant.name,
                        confidence: 0,
                        text_length: 0,
                        match_summary: FieldMatches::default(),
                        selection_score: 0.0,
                        error: Some(e.to_string()),
                    });
                }
                Ok(recognition) => {
                    let extracted =
                        extract::extract(&recognition.raw_text, claim, &self.config.matching);
                    let fused =
                        fuse::fuse(recognition.engine_confidence, &extracted, &self.config.weights);
                    let score = selection_score(
                        fused.confidence,
                        recognition.raw_text.len(),
                        &extracted.matches,
                    );

                    debug!(
                        "variant {}: confidence {} selection {:.1} matches {:?}",
                        variant.name, fused.confidence, score, extracted.matches
                    );
                    trace.push(AttemptTrace {
                        variant: variant.name,
                        confidence: fused.confidence,
                        text_length: recognition.raw_text.len(),
                        match_summary: extracted.matches,
                        selection_score: score,
                        error: None,
                    });

                    // Strict > while scanning in catalog order: ties break
                    // to the earliest variant, deterministically.
                    if best.as_ref().is_none_or(|b| score > b.selection_score) {
                        best = Some(BestAttempt {
                            selection_score: score,
                            confidence: fused.confidence,
                            extracted,
                            failure_reasons: fused.failure_reasons,
                        });
                    }
                }
            }
        }

        match best {
            Some(attempt) => {
                let decision = fuse::decide(
                    attempt.confidence,
                    &attempt.extracted,
                    self.config.approval_threshold.0,
                );
                // Failure reasons are empty exactly when auto-approved;
                // advisory notes have no audience on an approval.
                let failure_reasons = if decision == Decision::AutoApproved {
                    Vec::new()
                } else {
                    attempt.failure_reasons
                };
                VerificationOutcome {
                    confidence: attempt.confidence,
                    decision,
                    extracted: attempt.extracted,
                    failure_reasons,
                    trace,
                }
            }
            None => VerificationOutcome {
                confidence: 0,
                decision: Decision::PendingReview,
                extracted: ExtractedIdentity::default(),
                failure_reasons: vec![
                    "all recognition strategies failed; document could not be read".to_string(),
                ],
                trace,
            },
        }
    }
}

struct BestAttempt {
    selection_score: f32,
    confidence: u8,
    extracted: ExtractedIdentity,
    failure_reasons: Vec<String>,
}

/// Internal score used only to pick the best preprocessing attempt.
///
/// Distinct from the reported confidence: text length is a useful quality
/// proxy (very short extractions are usually preprocessing failures) but
/// would make the user-facing confidence uninterpretable.
fn selection_score(confidence: u8, text_length: usize, matches: &FieldMatches) -> f32 {
    let mut match_score = 0.0;
    if matches.student_id {
        match_score += 20.0;
    }
    if matches.name {
        match_score += 15.0;
    }
    if matches.institution {
        match_score += 5.0;
    }

    SELECT_CONFIDENCE_WEIGHT * confidence as f32
        + SELECT_TEXT_WEIGHT * (text_length as f32 / 10.0).min(TEXT_LENGTH_CAP)
        + SELECT_MATCH_WEIGHT * match_score
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use image::ImageBuffer;

    use super::*;
    use crate::error::RecognitionError;
    use crate::model::RecognitionResult;

    /// Returns the same text for every variant and counts invocations.
    struct StaticEngine {
        text: &'static str,
        confidence: f32,
        calls: RefCell<usize>,
    }

    impl TextRecognizer for StaticEngine {
        fn recognize(&self, _image: &DynamicImage) -> Result<RecognitionResult, RecognitionError> {
            *self.calls.borrow_mut() += 1;
            Ok(RecognitionResult {
                raw_text: self.text.to_string(),
                engine_confidence: Some(self.confidence),
                word_count: self.text.split_whitespace().count(),
            })
        }
    }

    #[test]
    fn test_failed_transform_falls_back_to_untransformed_image() {
        // 0x0 dimensions make every catalog transform fail, so each variant
        // must recognize the untransformed image instead of erroring out.
        let degenerate = DynamicImage::ImageRgba8(ImageBuffer::new(0, 0));
        let claim = IdentityClaim {
            email: Some("juan.dela.cruz@plv.edu.ph".to_string()),
            declared_full_name: None,
            student_id: Some("21-1234".to_string()),
        };

        let engine = StaticEngine {
            text: "JUAN DELA CRUZ 21-1234 PAMANTASAN",
            confidence: 85.0,
            calls: RefCell::new(0),
        };
        let verifier = Verifier::with_engine(engine);
        let outcome = verifier.run(&degenerate, &claim);

        assert_eq!(*verifier.engine.calls.borrow(), preprocess::catalog().len());
        assert_eq!(outcome.trace.len(), preprocess::catalog().len());
        assert!(
            outcome.trace.iter().all(|t| t.error.is_none()),
            "fallback attempts must be recognized entries, not error entries"
        );
        assert_eq!(outcome.decision, Decision::AutoApproved);
    }

    #[test]
    fn test_selection_score_weighs_matches_over_length() {
        let all = FieldMatches { student_id: true, name: true, institution: true };
        let none = FieldMatches::default();

        let matched = selection_score(50, 100, &all);
        let long_unmatched = selection_score(50, 10_000, &none);
        assert!(matched > long_unmatched, "match score must dominate text length");
    }

    #[test]
    fn test_selection_score_caps_text_length() {
        let none = FieldMatches::default();
        let at_cap = selection_score(0, 2_000, &none);
        let beyond_cap = selection_score(0, 100_000, &none);
        assert_eq!(at_cap, beyond_cap);
        assert_eq!(at_cap, 4.0);
    }
}
