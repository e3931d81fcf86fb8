// ABOUTME: Text side of the pipeline: font atlas, layout, and coverage mask.
// ABOUTME: Produces the glyph metrics shared by the mask and composite passes.

pub mod atlas;
pub mod layout;
pub mod mask;
pub mod placement;

pub use atlas::{AtlasError, AtlasProvider, AtlasTexture, DirectoryAtlasProvider, FontAtlas, FontUniform, MsdfAtlas};
pub use layout::{CharacterMetric, TextLayout, FALLBACK_METRIC, MAX_CHARACTERS};
pub use mask::{TextMask, COVERAGE_THRESHOLD, MASK_HEIGHT, MASK_WIDTH};
pub use placement::TextPlacement;
