//! Document identity verification pipeline.
//!
//! Given a photographed ID document and a claimed identity (email, declared
//! name, student number), this crate tries a catalog of image-preprocessing
//! variants, recognizes text with an external OCR engine, reconciles the
//! extracted fields against the claim under noisy OCR conditions, fuses the
//! signals into one confidence score, and returns an auto-approve /
//! pending-review decision with machine-readable failure reasons.
//!
//! The single entry point is [`Verifier::verify`]; everything it returns is
//! in [`model::VerificationOutcome`].

pub mod error;
pub mod extract;
pub mod fuse;
pub mod model;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;

pub use error::{RecognitionError, TransformError, VerifyError};
pub use model::{Decision, IdentityClaim, VerificationOutcome};
pub use ocr::{TesseractEngine, TextRecognizer};
pub use pipeline::{VerifyConfig, Verifier};
