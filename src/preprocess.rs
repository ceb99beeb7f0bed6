use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{adaptive_threshold, otsu_level};
use imageproc::filter::median_filter;

use crate::error::TransformError;

/// One deterministic image transform tried before recognition.
///
/// The catalog is configuration, not computed state: adding a variant means
/// adding a kind here and an arm in [`apply`]; nothing downstream changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Original image, untouched. Baseline hypothesis.
    PassThrough,
    /// Plain grayscale conversion.
    Grayscale,
    /// Grayscale + contrast boost + sharpen. Helps washed-out photos.
    Enhanced,
    /// Grayscale + global Otsu binarization. Helps evenly-lit cards.
    Threshold,
    /// Median denoise + adaptive local threshold. Helps noisy phone shots
    /// with uneven lighting.
    AdaptiveDenoise,
    /// Gamma lift + contrast boost. Helps underexposed captures.
    GammaContrast,
}

/// A catalog entry: transform kind plus the stable name used in traces.
#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub kind: VariantKind,
    pub name: &'static str,
}

/// Fixed, ordered transform catalog. Order only affects trace readability
/// and selection tie-breaking (earlier wins on equal scores).
pub const CATALOG: [Variant; 6] = [
    Variant { kind: VariantKind::PassThrough, name: "pass_through" },
    Variant { kind: VariantKind::Grayscale, name: "grayscale" },
    Variant { kind: VariantKind::Enhanced, name: "enhanced" },
    Variant { kind: VariantKind::Threshold, name: "threshold" },
    Variant { kind: VariantKind::AdaptiveDenoise, name: "adaptive_denoise" },
    Variant { kind: VariantKind::GammaContrast, name: "gamma_contrast" },
];

pub fn catalog() -> &'static [Variant] {
    &CATALOG
}

/// Contrast boost applied by the `enhanced` and `gamma_contrast` variants.
const CONTRAST_BOOST: f32 = 30.0;

/// Gamma below 1.0 lifts midtones on underexposed captures.
const GAMMA: f32 = 0.7;

/// Block radius for the adaptive local threshold (15x15 neighborhood).
const ADAPTIVE_BLOCK_RADIUS: u32 = 7;

/// Applies one catalog transform to a decoded image.
///
/// Pure with respect to the input; never touches the filesystem. A failed
/// transform is recoverable upstream by recognizing the untransformed image
/// for that variant instead.
pub fn apply(img: &DynamicImage, variant: &Variant) -> Result<DynamicImage, TransformError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(TransformError {
            variant: variant.name,
            message: format!("degenerate image dimensions {w}x{h}"),
        });
    }

    let out = match variant.kind {
        VariantKind::PassThrough => img.clone(),
        VariantKind::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
        VariantKind::Enhanced => {
            let gray = DynamicImage::ImageLuma8(img.to_luma8());
            gray.adjust_contrast(CONTRAST_BOOST).unsharpen(1.0, 2)
        }
        VariantKind::Threshold => {
            let gray = img.to_luma8();
            let level = otsu_level(&gray);
            DynamicImage::ImageLuma8(threshold_at(&gray, level))
        }
        VariantKind::AdaptiveDenoise => {
            let gray = img.to_luma8();
            let denoised = median_filter(&gray, 1, 1);
            DynamicImage::ImageLuma8(adaptive_threshold(&denoised, ADAPTIVE_BLOCK_RADIUS))
        }
        VariantKind::GammaContrast => {
            let gray = img.to_luma8();
            DynamicImage::ImageLuma8(gamma_lift(&gray, GAMMA)).adjust_contrast(CONTRAST_BOOST)
        }
    };

    Ok(out)
}

/// Binarizes a grayscale image at a fixed level.
///
/// Pixels at or above the level become white (background), the rest black
/// (ink). Dark text on a light card survives as black-on-white, which is
/// what the recognition engine prefers.
fn threshold_at(gray: &GrayImage, level: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output: GrayImage = ImageBuffer::new(width, height);

    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] >= level { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Applies a gamma curve via a 256-entry lookup table.
fn gamma_lift(gray: &GrayImage, gamma: f32) -> GrayImage {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let normalized = i as f32 / 255.0;
        *slot = (normalized.powf(gamma) * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    let (width, height) = gray.dimensions();
    let mut output: GrayImage = ImageBuffer::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        output.put_pixel(x, y, Luma([lut[pixel[0] as usize]]));
    }

    output
}
