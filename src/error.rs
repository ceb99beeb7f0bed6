use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a verification before any variant is attempted.
///
/// Everything else (a failed transform, a failed recognition run, even all
/// variants failing) degrades to an ordinary [`VerificationOutcome`] so the
/// caller never has to distinguish "broken pipeline" from "low-confidence
/// document".
///
/// [`VerificationOutcome`]: crate::model::VerificationOutcome
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The input image does not exist or cannot be decoded.
    #[error("cannot read input image {path}: {message}")]
    InputNotFound { path: PathBuf, message: String },

    /// The claim carries no field that could ever be corroborated.
    #[error("claim has no email, declared name, or student ID to verify against")]
    EmptyClaim,
}

/// A single preprocessing variant's image transform failed.
///
/// Recovered by falling back to the untransformed image for that variant.
#[derive(Debug, Error)]
#[error("image transform '{variant}' failed: {message}")]
pub struct TransformError {
    pub variant: &'static str,
    pub message: String,
}

/// The OCR engine failed on one variant's image.
///
/// Recovered by recording a zero-confidence trace entry and moving on to the
/// next variant. "No text found" is NOT a recognition error; that is a valid
/// zero-signal result.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("failed to write transformed image for recognition: {0}")]
    Encode(#[from] image::ImageError),

    #[error("i/o error while invoking recognition engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("recognition engine failed: {0}")]
    Engine(String),
}
