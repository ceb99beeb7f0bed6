use serde::{Deserialize, Serialize};

use crate::model::{Decision, ExtractedIdentity};

/// Fixed fusion weights. Engine confidence contributes proportionally, the
/// three field matches contribute flat points. Maximum total is 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionWeights {
    pub engine_weight: f32,
    pub student_id_points: f32,
    pub name_points: f32,
    pub institution_points: f32,
    /// Substituted when the engine reports no confidence at all.
    pub base_engine_confidence: f32,
    /// Engine confidence below this earns a quality failure reason.
    pub quality_floor: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            engine_weight: 0.40,
            student_id_points: 30.0,
            name_points: 20.0,
            institution_points: 10.0,
            base_engine_confidence: 50.0,
            quality_floor: 50.0,
        }
    }
}

impl FusionWeights {
    /// Best possible fused score; must not exceed 100.
    pub fn maximum(&self) -> f32 {
        self.engine_weight * 100.0
            + self.student_id_points
            + self.name_points
            + self.institution_points
    }
}

/// Fusion output: one 0–100 score plus one human-readable reason per signal
/// that failed to contribute, so callers can explain the outcome without
/// re-deriving pipeline internals.
#[derive(Debug, Clone)]
pub struct FusedScore {
    pub confidence: u8,
    pub failure_reasons: Vec<String>,
}

/// Combines engine confidence and field matches into one score.
pub fn fuse(
    engine_confidence: Option<f32>,
    extracted: &ExtractedIdentity,
    weights: &FusionWeights,
) -> FusedScore {
    let mut reasons = Vec::new();

    let engine = match engine_confidence {
        Some(conf) => {
            if conf < weights.quality_floor {
                reasons.push(format!(
                    "low OCR quality: engine confidence {:.0} below {:.0}",
                    conf, weights.quality_floor
                ));
            }
            conf
        }
        None => {
            reasons.push(format!(
                "engine reported no confidence; substituted base value {:.0}",
                weights.base_engine_confidence
            ));
            weights.base_engine_confidence
        }
    };

    let mut score = engine.clamp(0.0, 100.0) * weights.engine_weight;

    if extracted.matches.student_id {
        score += weights.student_id_points;
    } else {
        reasons.push(match &extracted.student_id {
            Some(found) => format!("student ID '{found}' on document does not match the claim"),
            None => "no student ID found on the document".to_string(),
        });
    }

    if extracted.matches.name {
        score += weights.name_points;
    } else {
        reasons.push(match &extracted.name {
            Some(name) => format!("name '{name}' not found on the document"),
            None => "claim provides no name to match".to_string(),
        });
    }

    if extracted.matches.institution {
        score += weights.institution_points;
    } else {
        reasons.push("expected institution marker not found on the document".to_string());
    }

    FusedScore {
        confidence: score.round().clamp(0.0, 100.0) as u8,
        failure_reasons: reasons,
    }
}

/// Decision policy: auto-approval needs the confidence threshold AND both
/// identity matches. A high score built mostly from OCR quality must never
/// approve an identity mismatch. Everything else stays reviewable; a hard
/// reject is an admin decision, never ours.
pub fn decide(confidence: u8, extracted: &ExtractedIdentity, threshold: u8) -> Decision {
    if confidence >= threshold && extracted.matches.student_id && extracted.matches.name {
        Decision::AutoApproved
    } else {
        Decision::PendingReview
    }
}
