// ABOUTME: Text layout stage turning a display string into glyph metrics.
// ABOUTME: Fixed 100-character capacity with a three-tier glyph fallback.

use bytemuck::{Pod, Zeroable};

use crate::atlas::FontAtlas;

/// Maximum characters laid out and uploaded to the shaders
pub const MAX_CHARACTERS: usize = 100;

/// Placement data of one glyph, laid out to match the WGSL `CharacterMetric` struct.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CharacterMetric {
    pub atlas_pos: [f32; 2],
    pub size: [f32; 2],
    pub offset: [f32; 2],
    pub advance: f32,
    pub char_code: u32,
}

/// Used when neither the character nor a space exists in the atlas
pub const FALLBACK_METRIC: CharacterMetric = CharacterMetric {
    atlas_pos: [0.0, 0.0],
    size: [0.0, 0.0],
    offset: [0.0, 0.0],
    advance: 13.0,
    char_code: 32,
};

pub fn metric_for(atlas: &dyn FontAtlas, c: char) -> CharacterMetric {
    atlas
        .metrics(c)
        .or_else(|| atlas.metrics(' '))
        .unwrap_or(FALLBACK_METRIC)
}

pub fn layout_text(text: &str, atlas: &dyn FontAtlas) -> Vec<CharacterMetric> {
    text.chars()
        .take(MAX_CHARACTERS)
        .map(|c| metric_for(atlas, c))
        .collect()
}

/// Metrics for the current display string, rebuilt only when it changes.
#[derive(Debug, Default)]
pub struct TextLayout {
    text: Option<String>,
    metrics: Vec<CharacterMetric>,
}

impl TextLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `text` if it differs from the previous string. Returns true on relayout.
    pub fn set_text(&mut self, text: &str, atlas: &dyn FontAtlas) -> bool {
        if self.text.as_deref() == Some(text) {
            return false;
        }

        self.metrics = layout_text(text, atlas);
        self.text = Some(text.to_owned());

        let total = text.chars().count();
        if total > MAX_CHARACTERS {
            tracing::warn!(
                "Display text has {} characters, truncated to {}",
                total,
                MAX_CHARACTERS
            );
        } else {
            tracing::debug!("Laid out {} characters", total);
        }
        true
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn metrics(&self) -> &[CharacterMetric] {
        &self.metrics
    }

    pub fn char_count(&self) -> u32 {
        self.metrics.len() as u32
    }

    /// Width of the laid-out line in atlas pixels
    pub fn total_advance(&self) -> f32 {
        self.metrics.iter().map(|m| m.advance).sum()
    }

    /// Full-capacity array for the GPU metrics buffer, zero past `char_count`
    pub fn gpu_metrics(&self) -> [CharacterMetric; MAX_CHARACTERS] {
        let mut out = [CharacterMetric::zeroed(); MAX_CHARACTERS];
        out[..self.metrics.len()].copy_from_slice(&self.metrics);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::tests::{test_atlas, test_texture};
    use crate::atlas::MsdfAtlas;

    #[test]
    fn test_metric_is_32_bytes() {
        assert_eq!(std::mem::size_of::<CharacterMetric>(), 32);
    }

    #[test]
    fn test_length_matches_short_strings() {
        let atlas = test_atlas();
        for len in [0, 1, 7, 99, 100] {
            let text = "A".repeat(len);
            assert_eq!(layout_text(&text, &atlas).len(), len);
        }
    }

    #[test]
    fn test_unknown_glyph_falls_back_to_space() {
        let atlas = test_atlas();
        let metrics = layout_text("Aé", &atlas);
        assert_eq!(metrics[0].char_code, 65);
        assert_eq!(metrics[1].char_code, 32);
        assert_eq!(metrics[1].advance, 6.0);
    }

    #[test]
    fn test_missing_space_uses_hardcoded_fallback() {
        let json = r#"{
            "chars": [{"id": 65, "x": 4, "y": 4, "width": 8, "height": 8,
                       "xoffset": 1, "yoffset": 2, "xadvance": 10}],
            "common": {"lineHeight": 12, "base": 10, "scaleW": 16, "scaleH": 16},
            "distanceField": {"fieldType": "msdf", "distanceRange": 4}
        }"#;
        let atlas = MsdfAtlas::from_json(json, test_texture()).unwrap();
        let metrics = layout_text("日本", &atlas);
        assert_eq!(metrics.len(), 2);
        for m in metrics {
            assert_eq!(m, FALLBACK_METRIC);
            assert_eq!(m.advance, 13.0);
            assert_eq!(m.char_code, 32);
        }
    }

    #[test]
    fn test_change_to_long_string_truncates() {
        let atlas = test_atlas();
        let mut layout = TextLayout::new();
        assert!(layout.set_text("Mitakpa", &atlas));
        assert_eq!(layout.char_count(), 7);

        let long: String = "A".repeat(150);
        assert!(layout.set_text(&long, &atlas));
        assert_eq!(layout.char_count(), MAX_CHARACTERS as u32);
        assert_eq!(layout.metrics().len(), MAX_CHARACTERS);

        let gpu = layout.gpu_metrics();
        assert_eq!(gpu.len(), MAX_CHARACTERS);
        assert_eq!(gpu[MAX_CHARACTERS - 1].char_code, 65);
    }

    #[test]
    fn test_unchanged_string_skips_relayout() {
        let atlas = test_atlas();
        let mut layout = TextLayout::new();
        assert!(layout.set_text("AA", &atlas));
        assert!(!layout.set_text("AA", &atlas));
        assert!(layout.set_text("A", &atlas));
    }

    #[test]
    fn test_layout_is_idempotent() {
        let atlas = test_atlas();
        let mut first = TextLayout::new();
        let mut second = TextLayout::new();
        first.set_text("A A?", &atlas);
        second.set_text("A A?", &atlas);

        let a = first.gpu_metrics();
        let b = second.gpu_metrics();
        assert_eq!(bytemuck::cast_slice::<_, u8>(&a), bytemuck::cast_slice::<_, u8>(&b));
    }

    #[test]
    fn test_total_advance() {
        let atlas = test_atlas();
        let mut layout = TextLayout::new();
        layout.set_text("A A", &atlas);
        assert_eq!(layout.total_advance(), 26.0);
    }
}
