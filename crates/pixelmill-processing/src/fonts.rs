//! Font discovery for text rendering (watermark, meme).
//!
//! No font ships with the binary; a TTF is located once per process from
//! `FONT_PATH` or a list of well-known system locations and cached for the
//! process lifetime.

use std::sync::OnceLock;

use ab_glyph::FontVec;

use crate::codec::TransformError;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static SHARED_FONT: OnceLock<Option<FontVec>> = OnceLock::new();

/// The process-wide text rendering font.
///
/// `explicit` (from configuration) wins over the candidate list. Fails with
/// `FontUnavailable` when nothing usable is found.
pub fn shared_font(explicit: Option<&str>) -> Result<&'static FontVec, TransformError> {
    let font = SHARED_FONT.get_or_init(|| {
        if let Some(path) = explicit {
            match load_font(path) {
                Some(font) => return Some(font),
                None => {
                    tracing::warn!(path = %path, "FONT_PATH did not yield a usable font; probing system locations");
                }
            }
        }
        for path in FONT_CANDIDATES {
            if let Some(font) = load_font(path) {
                tracing::debug!(path = %path, "Loaded text rendering font");
                return Some(font);
            }
        }
        None
    });
    font.as_ref().ok_or(TransformError::FontUnavailable)
}

fn load_font(path: &str) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_font_missing_path() {
        assert!(load_font("/definitely/not/a/font.ttf").is_none());
    }
}
