pub mod tesseract;

pub use tesseract::TesseractEngine;

use image::DynamicImage;

use crate::error::RecognitionError;
use crate::model::RecognitionResult;

/// Narrow contract over the external text-recognition engine.
///
/// Implementations must treat "no text found" as a valid zero-signal result
/// (`Ok` with empty text and no confidence), never as an error. Errors are
/// reserved for the engine genuinely failing on the input.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult, RecognitionError>;
}
