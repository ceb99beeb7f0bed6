use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::TextRecognizer;
use crate::error::RecognitionError;
use crate::model::RecognitionResult;

/// Adapter over the Tesseract CLI.
///
/// Writes the (possibly transformed) image to a scoped temporary PNG, runs
/// `tesseract` with TSV output, and folds per-word confidences into one
/// engine confidence. Both temporary files are released on every exit path:
/// the PNG and the TSV base by RAII, the `.tsv` sidecar explicitly below.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
    lang: String,
    page_seg_mode: u8,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
            // Assume a single uniform block of text; ID cards are dense.
            page_seg_mode: 6,
        }
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = executable;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_page_seg_mode(mut self, psm: u8) -> Self {
        self.page_seg_mode = psm;
        self
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult, RecognitionError> {
        // Save image to a temporary file the engine can read.
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        // Tesseract appends .tsv to the output base itself.
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("tsv")
            .output()
            .map_err(|e| {
                RecognitionError::Engine(format!(
                    "failed to invoke '{}' (is tesseract installed?): {e}",
                    self.executable.display()
                ))
            })?;

        let tsv_path = format!("{output_base}.tsv");

        let parsed = if output.status.success() {
            std::fs::read_to_string(&tsv_path)
                .map(|tsv| parse_tsv_output(&tsv))
                .map_err(|e| RecognitionError::Engine(format!("failed to read TSV output: {e}")))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RecognitionError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        };

        // The engine may have written the sidecar even when it exited
        // non-zero; release it before returning on any path. Cleanup
        // failure must not mask the recognition result.
        match std::fs::remove_file(&tsv_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove temporary TSV {tsv_path}: {e}"),
        }

        let result = parsed?;
        debug!(
            "tesseract: {} words, confidence {:?}",
            result.word_count, result.engine_confidence
        );
        Ok(result)
    }
}

/// Parses Tesseract TSV output into raw text plus a mean word confidence.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Level 5 rows are words. Zero
/// recognized words is a valid result with no engine confidence.
fn parse_tsv_output(tsv: &str) -> RecognitionResult {
    let mut words: Vec<String> = Vec::new();
    let mut conf_sum: f32 = 0.0;
    let mut conf_count: usize = 0;
    let mut text = String::new();
    let mut current_line_num: i32 = -1;

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let line_num: i32 = fields[4].parse().unwrap_or(-1);
        if current_line_num >= 0 && line_num != current_line_num {
            text.push('\n');
        } else if !text.is_empty() {
            text.push(' ');
        }
        current_line_num = line_num;
        text.push_str(word);

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf >= 0.0 {
            conf_sum += conf;
            conf_count += 1;
        }
        words.push(word.to_string());
    }

    let engine_confidence = if conf_count > 0 {
        Some(conf_sum / conf_count as f32)
    } else {
        None
    };

    RecognitionResult {
        raw_text: text,
        engine_confidence,
        word_count: words.len(),
    }
}
