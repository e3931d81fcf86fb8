// ABOUTME: MSDF font atlas loading for GPU text rendering.
// ABOUTME: Parses BMFont-style JSON glyph tables and their page image.

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::layout::CharacterMetric;

/// Per-font values consumed by the text shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FontUniform {
    pub baseline: f32,
    pub line_height: f32,
    pub atlas_size: [f32; 2],
    pub distance_range: f32,
    pub _padding: [f32; 3],
}

#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("Failed to read font atlas: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse font atlas: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode atlas image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported distance field type: {0}")]
    UnsupportedField(String),

    #[error("Atlas image is {actual:?} but the glyph table expects {expected:?}")]
    DimensionMismatch { expected: (u32, u32), actual: (u32, u32) },
}

/// RGBA8 page image of an atlas.
#[derive(Debug, Clone)]
pub struct AtlasTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl AtlasTexture {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AtlasError> {
        if pixels.len() != (width * height * 4) as usize {
            return Err(AtlasError::DimensionMismatch {
                expected: (width, height),
                actual: (width, (pixels.len() / (width.max(1) as usize * 4)) as u32),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self, AtlasError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let idx = (y * self.width as usize + x) * 4;
        [
            self.pixels[idx] as f32 / 255.0,
            self.pixels[idx + 1] as f32 / 255.0,
            self.pixels[idx + 2] as f32 / 255.0,
        ]
    }

    /// Bilinear RGB sample at atlas pixel coordinates, clamped to the edge.
    pub fn sample(&self, x: f32, y: f32) -> [f32; 3] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 3];
        }
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for i in 0..3 {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Glyph metrics and texture for one loaded font.
pub trait FontAtlas: Send + Sync {
    fn metrics(&self, c: char) -> Option<CharacterMetric>;
    fn baseline(&self) -> f32;
    fn line_height(&self) -> f32;
    fn atlas_size(&self) -> [f32; 2];
    fn distance_range(&self) -> f32;
    fn texture(&self) -> &AtlasTexture;

    fn uniform(&self) -> FontUniform {
        FontUniform {
            baseline: self.baseline(),
            line_height: self.line_height(),
            atlas_size: self.atlas_size(),
            distance_range: self.distance_range(),
            _padding: [0.0; 3],
        }
    }
}

/// Resolves a font id to a loaded atlas.
pub trait AtlasProvider {
    fn load_font(&self, font_id: &str) -> Result<Box<dyn FontAtlas>, AtlasError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BmCommon {
    line_height: f32,
    base: f32,
    scale_w: u32,
    scale_h: u32,
}

#[derive(Debug, Deserialize)]
struct BmChar {
    id: u32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    xoffset: f32,
    yoffset: f32,
    xadvance: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BmDistanceField {
    field_type: String,
    distance_range: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BmFontFile {
    chars: Vec<BmChar>,
    common: BmCommon,
    distance_field: BmDistanceField,
}

/// Atlas in the layout emitted by msdf-bmfont-xml.
pub struct MsdfAtlas {
    glyphs: HashMap<char, CharacterMetric>,
    baseline: f32,
    line_height: f32,
    atlas_size: [f32; 2],
    distance_range: f32,
    texture: AtlasTexture,
}

impl MsdfAtlas {
    pub fn from_json(json: &str, texture: AtlasTexture) -> Result<Self, AtlasError> {
        let file: BmFontFile = serde_json::from_str(json)?;

        match file.distance_field.field_type.as_str() {
            "msdf" | "mtsdf" => {}
            other => return Err(AtlasError::UnsupportedField(other.to_string())),
        }

        let expected = (file.common.scale_w, file.common.scale_h);
        if texture.dimensions() != expected {
            return Err(AtlasError::DimensionMismatch {
                expected,
                actual: texture.dimensions(),
            });
        }

        let glyphs = file
            .chars
            .iter()
            .filter_map(|ch| {
                let c = char::from_u32(ch.id)?;
                Some((
                    c,
                    CharacterMetric {
                        atlas_pos: [ch.x, ch.y],
                        size: [ch.width, ch.height],
                        offset: [ch.xoffset, ch.yoffset],
                        advance: ch.xadvance,
                        char_code: ch.id,
                    },
                ))
            })
            .collect();

        Ok(Self {
            glyphs,
            baseline: file.common.base,
            line_height: file.common.line_height,
            atlas_size: [expected.0 as f32, expected.1 as f32],
            distance_range: file.distance_field.distance_range,
            texture,
        })
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl FontAtlas for MsdfAtlas {
    fn metrics(&self, c: char) -> Option<CharacterMetric> {
        self.glyphs.get(&c).copied()
    }

    fn baseline(&self) -> f32 {
        self.baseline
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn atlas_size(&self) -> [f32; 2] {
        self.atlas_size
    }

    fn distance_range(&self) -> f32 {
        self.distance_range
    }

    fn texture(&self) -> &AtlasTexture {
        &self.texture
    }
}

/// Loads `<root>/<font_id>.json` with its `<root>/<font_id>.png` page.
pub struct DirectoryAtlasProvider {
    root: PathBuf,
}

impl DirectoryAtlasProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AtlasProvider for DirectoryAtlasProvider {
    fn load_font(&self, font_id: &str) -> Result<Box<dyn FontAtlas>, AtlasError> {
        let json = std::fs::read_to_string(self.root.join(format!("{font_id}.json")))?;
        let png = std::fs::read(self.root.join(format!("{font_id}.png")))?;
        let atlas = MsdfAtlas::from_json(&json, AtlasTexture::from_png(&png)?)?;

        let (w, h) = atlas.texture().dimensions();
        tracing::info!(
            "Loaded font atlas '{}': {} glyphs, {}x{} px, distance range {}",
            font_id,
            atlas.glyph_count(),
            w,
            h,
            atlas.distance_range()
        );

        Ok(Box::new(atlas))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16x16 atlas holding a single fully inside 8x8 'A' block at (4, 4).
    pub(crate) const TEST_FONT: &str = r#"{
        "pages": ["test.png"],
        "chars": [
            {"id": 65, "char": "A", "x": 4, "y": 4, "width": 8, "height": 8,
             "xoffset": 1, "yoffset": 2, "xadvance": 10, "page": 0, "chnl": 15},
            {"id": 32, "char": " ", "x": 0, "y": 0, "width": 0, "height": 0,
             "xoffset": 0, "yoffset": 0, "xadvance": 6, "page": 0, "chnl": 15}
        ],
        "common": {"lineHeight": 12, "base": 10, "scaleW": 16, "scaleH": 16,
                   "pages": 1, "packed": 0},
        "distanceField": {"fieldType": "msdf", "distanceRange": 4}
    }"#;

    pub(crate) fn test_texture() -> AtlasTexture {
        let mut pixels = vec![0u8; 16 * 16 * 4];
        for y in 4..12 {
            for x in 4..12 {
                let idx = (y * 16 + x) * 4;
                pixels[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        AtlasTexture::new(16, 16, pixels).unwrap()
    }

    pub(crate) fn test_atlas() -> MsdfAtlas {
        MsdfAtlas::from_json(TEST_FONT, test_texture()).unwrap()
    }

    #[test]
    fn test_parse_bmfont_json() {
        let atlas = test_atlas();
        assert_eq!(atlas.glyph_count(), 2);

        let a = atlas.metrics('A').unwrap();
        assert_eq!(a.atlas_pos, [4.0, 4.0]);
        assert_eq!(a.size, [8.0, 8.0]);
        assert_eq!(a.offset, [1.0, 2.0]);
        assert_eq!(a.advance, 10.0);
        assert_eq!(a.char_code, 65);
        assert!(atlas.metrics('Z').is_none());
    }

    #[test]
    fn test_font_uniform() {
        let uniform = test_atlas().uniform();
        assert_eq!(uniform.baseline, 10.0);
        assert_eq!(uniform.line_height, 12.0);
        assert_eq!(uniform.atlas_size, [16.0, 16.0]);
        assert_eq!(uniform.distance_range, 4.0);
        assert_eq!(std::mem::size_of::<FontUniform>(), 32);
    }

    #[test]
    fn test_rejects_plain_sdf() {
        let json = TEST_FONT.replace("\"msdf\"", "\"sdf\"");
        let err = MsdfAtlas::from_json(&json, test_texture()).err().unwrap();
        assert!(matches!(err, AtlasError::UnsupportedField(ref f) if f == "sdf"));
    }

    #[test]
    fn test_rejects_wrong_page_size() {
        let texture = AtlasTexture::new(8, 8, vec![0; 8 * 8 * 4]).unwrap();
        let err = MsdfAtlas::from_json(TEST_FONT, texture).err().unwrap();
        assert!(matches!(err, AtlasError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let provider = DirectoryAtlasProvider::new(std::env::temp_dir().join("no-such-waddle-fonts"));
        assert!(matches!(provider.load_font("ppacma"), Err(AtlasError::Io(_))));
    }

    #[test]
    fn test_bilinear_sample() {
        let texture = test_texture();
        assert_eq!(texture.sample(8.0, 8.0), [1.0, 1.0, 1.0]);
        assert_eq!(texture.sample(1.0, 1.0), [0.0, 0.0, 0.0]);
        // Halfway across the block edge
        let edge = texture.sample(4.0, 8.0);
        assert!((edge[0] - 0.5).abs() < 1e-6);
    }
}
