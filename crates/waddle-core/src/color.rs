// ABOUTME: Color representation and conversion utilities.
// ABOUTME: Provides the palette used for background, text, and particle dust.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Near-black night sky behind the text
    pub const NIGHT: Self = Self::rgb(0.01, 0.01, 0.02);

    /// Text fill
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Warm dust tint for particles
    pub const DUST: Self = Self::rgb(1.0, 0.86, 0.62);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
