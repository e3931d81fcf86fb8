// ABOUTME: Host-side text mask, the CPU twin of the GPU mask pass.
// ABOUTME: Rasterizes MSDF glyph coverage into a single-channel 1024x256 grid.

use crate::atlas::FontAtlas;
use crate::layout::{CharacterMetric, TextLayout};
use crate::placement::TextPlacement;

pub const MASK_WIDTH: u32 = 1024;
pub const MASK_HEIGHT: u32 = 256;

/// Coverage at or above this counts as inside a glyph
pub const COVERAGE_THRESHOLD: f32 = 0.5;

fn median(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).max(a.max(b).min(c))
}

/// Coverage of the laid-out line at an atlas-pixel position in the line box.
pub fn glyph_coverage(
    metrics: &[CharacterMetric],
    atlas: &dyn FontAtlas,
    placement: &TextPlacement,
    font_pos: [f32; 2],
) -> f32 {
    let screen_px_range = (atlas.distance_range() * placement.scale).max(1.0);
    let texture = atlas.texture();

    let mut pen = 0.0;
    let mut coverage: f32 = 0.0;
    for m in metrics {
        let x0 = pen + m.offset[0];
        let y0 = m.offset[1];
        pen += m.advance;

        if m.size[0] <= 0.0 || m.size[1] <= 0.0 {
            continue;
        }
        let local = [font_pos[0] - x0, font_pos[1] - y0];
        if local[0] < 0.0 || local[1] < 0.0 || local[0] > m.size[0] || local[1] > m.size[1] {
            continue;
        }

        let [r, g, b] = texture.sample(m.atlas_pos[0] + local[0], m.atlas_pos[1] + local[1]);
        let sd = median(r, g, b);
        let alpha = (screen_px_range * (sd - 0.5) + 0.5).clamp(0.0, 1.0);
        coverage = coverage.max(alpha);
    }
    coverage
}

/// Single-channel coverage grid, row 0 at the top.
#[derive(Debug, Clone)]
pub struct TextMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl TextMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height) as usize],
        }
    }

    pub fn rasterize(layout: &TextLayout, atlas: &dyn FontAtlas, resolution: [f32; 2]) -> Self {
        Self::rasterize_with_size(MASK_WIDTH, MASK_HEIGHT, layout, atlas, resolution)
    }

    /// Evaluate coverage at each texel center using the viewport's placement.
    pub fn rasterize_with_size(
        width: u32,
        height: u32,
        layout: &TextLayout,
        atlas: &dyn FontAtlas,
        resolution: [f32; 2],
    ) -> Self {
        let placement = TextPlacement::new(layout.total_advance(), atlas.line_height(), resolution);
        let metrics = layout.metrics();

        let mut mask = Self::empty(width, height);
        for row in 0..height {
            let v = 1.0 - (row as f32 + 0.5) / height as f32;
            for col in 0..width {
                let u = (col as f32 + 0.5) / width as f32;
                let font_pos = placement.font_space([u, v]);
                let c = glyph_coverage(metrics, atlas, &placement, font_pos);
                mask.data[(row * width + col) as usize] = (c * 255.0).round() as u8;
            }
        }
        mask
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Nearest-texel coverage at a y-up uv, matching the compute shader's `textureLoad`.
    pub fn coverage(&self, uv: [f32; 2]) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let x = ((uv[0] * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = (((1.0 - uv[1]) * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.data[(y as u32 * self.width + x as u32) as usize] as f32 / 255.0
    }

    pub fn covers(&self, uv: [f32; 2]) -> bool {
        self.coverage(uv) >= COVERAGE_THRESHOLD
    }

    pub fn covered_fraction(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let covered = self.data.iter().filter(|&&v| v >= 128).count();
        covered as f32 / self.data.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::tests::test_atlas;

    #[test]
    fn test_median() {
        assert_eq!(median(0.1, 0.9, 0.5), 0.5);
        assert_eq!(median(1.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_glyph_interior_is_covered() {
        let atlas = test_atlas();
        let mut layout = TextLayout::new();
        layout.set_text("A", &atlas);

        // One 'A': advance 10, line height 12, quad at x 1..9, y 2..10.
        let mask = TextMask::rasterize_with_size(100, 100, &layout, &atlas, [100.0, 100.0]);
        let placement = TextPlacement::new(10.0, 12.0, [100.0, 100.0]);

        // Glyph center in font space is (5, 6); convert back to uv.
        let px = placement.origin[0] + 5.0 * placement.scale;
        let py = placement.origin[1] + 6.0 * placement.scale;
        assert!(mask.covers([px / 100.0, 1.0 - py / 100.0]));

        // Corners of the viewport are far outside the line.
        assert!(!mask.covers([0.02, 0.02]));
        assert!(!mask.covers([0.98, 0.98]));
        assert!(mask.covered_fraction() > 0.0);
    }

    #[test]
    fn test_spaces_cover_nothing() {
        let atlas = test_atlas();
        let mut layout = TextLayout::new();
        layout.set_text("   ", &atlas);
        let mask = TextMask::rasterize_with_size(64, 16, &layout, &atlas, [640.0, 160.0]);
        assert_eq!(mask.covered_fraction(), 0.0);
    }

    #[test]
    fn test_default_size() {
        let atlas = test_atlas();
        let layout = TextLayout::new();
        let mask = TextMask::rasterize(&layout, &atlas, [800.0, 600.0]);
        assert_eq!(mask.dimensions(), (MASK_WIDTH, MASK_HEIGHT));
        assert_eq!(mask.data().len(), (MASK_WIDTH * MASK_HEIGHT) as usize);
    }

    #[test]
    fn test_coverage_clamps_out_of_range_uv() {
        let mask = TextMask::empty(4, 4);
        assert_eq!(mask.coverage([-1.0, 2.0]), 0.0);
        assert_eq!(mask.coverage([5.0, -3.0]), 0.0);
    }
}
