use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Default longest side, in pixels, handed to the OCR engine.
pub const DEFAULT_MAX_SIDE_PX: u32 = 2800;

/// Share of the darkest and of the brightest pixels ignored when stretching,
/// so specks and glare on a photographed menu do not pin the range.
const CLIP_FRACTION: f64 = 0.005;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// How a scan is cleaned up before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocess {
    /// Scans whose longer side exceeds this are scaled down to it.
    pub max_side_px: u32,
    /// Reduce the page to pure black and white with an Otsu threshold.
    pub binarize: bool,
}

impl Default for Preprocess {
    fn default() -> Self {
        Self { max_side_px: DEFAULT_MAX_SIDE_PX, binarize: false }
    }
}

impl Preprocess {
    /// Decode an uploaded scan (JPEG, PNG, WEBP, …) and return PNG bytes ready for OCR.
    pub fn run(&self, data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
        let img = image::load_from_memory(data)?;
        let gray = self.apply(img);
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }

    fn apply(&self, img: DynamicImage) -> GrayImage {
        let img = if img.width().max(img.height()) > self.max_side_px {
            img.resize(self.max_side_px, self.max_side_px, FilterType::Triangle)
        } else {
            img
        };
        let mut gray = img.into_luma8();
        let hist = histogram(&gray);

        if let Some((lo, hi)) = clipped_range(&hist, CLIP_FRACTION) {
            stretch(&mut gray, lo, hi);
        }
        if self.binarize {
            let threshold = otsu_threshold(&histogram(&gray));
            for p in gray.pixels_mut() {
                p[0] = if p[0] > threshold { 255 } else { 0 };
            }
        }
        gray
    }
}

/// [`Preprocess::run`] with default settings.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    Preprocess::default().run(data)
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[usize::from(p[0])] += 1;
    }
    hist
}

/// Darkest and brightest levels once `clip` of the pixels on each end is
/// discarded. `None` when the page is a single tone.
fn clipped_range(hist: &[u64; 256], clip: f64) -> Option<(u8, u8)> {
    let total: u64 = hist.iter().sum();
    let skip = (total as f64 * clip) as u64;

    let lo = first_past(hist, 0..256, skip)?;
    let hi = first_past(hist, (0..256).rev(), skip)?;
    (hi > lo).then(|| (lo as u8, hi as u8))
}

fn first_past(hist: &[u64; 256], levels: impl Iterator<Item = usize>, skip: u64) -> Option<usize> {
    let mut seen = 0u64;
    for level in levels {
        seen += hist[level];
        if seen > skip {
            return Some(level);
        }
    }
    None
}

fn stretch(gray: &mut GrayImage, lo: u8, hi: u8) {
    let span = u32::from(hi - lo);
    for p in gray.pixels_mut() {
        let v = p[0].clamp(lo, hi) - lo;
        p[0] = (u32::from(v) * 255 / span) as u8;
    }
}

/// Level maximizing the between-class variance of ink and paper.
fn otsu_threshold(hist: &[u64; 256]) -> u8 {
    let total: u64 = hist.iter().sum();
    let weighted: f64 = hist.iter().enumerate().map(|(l, &n)| l as f64 * n as f64).sum();

    let (mut best, mut best_var) = (0u8, 0f64);
    let (mut bg_count, mut bg_sum) = (0u64, 0f64);
    for (level, &n) in hist.iter().enumerate() {
        bg_count += n;
        bg_sum += level as f64 * n as f64;
        let fg_count = total - bg_count;
        if bg_count == 0 || fg_count == 0 {
            continue;
        }
        let bg_mean = bg_sum / bg_count as f64;
        let fg_mean = (weighted - bg_sum) / fg_count as f64;
        let var = bg_count as f64 * fg_count as f64 * (bg_mean - fg_mean).powi(2);
        if var > best_var {
            best_var = var;
            best = level as u8;
        }
    }
    best
}
