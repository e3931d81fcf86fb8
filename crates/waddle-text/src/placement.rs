// ABOUTME: Shared text-area geometry for the mask, composite, and CPU mask.
// ABOUTME: Maps y-up uv coordinates into atlas-pixel space of the laid-out line.

/// Fraction of the viewport width the line may span
pub const TEXT_WIDTH_FILL: f32 = 0.9;
/// Fraction of the viewport height one line may span
pub const TEXT_HEIGHT_FILL: f32 = 0.4;

/// Scale and origin of the centered line for one target resolution.
///
/// Mirrors `text_placement` in `shaders/text_common.wgsl`; both passes feed it
/// the viewport resolution so mask texels and screen pixels agree in uv space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Screen pixels per atlas pixel
    pub scale: f32,
    /// Top-left of the line box in pixels, y down
    pub origin: [f32; 2],
    pub resolution: [f32; 2],
}

impl TextPlacement {
    pub fn new(total_advance: f32, line_height: f32, resolution: [f32; 2]) -> Self {
        let width_scale = if total_advance > 0.0 {
            TEXT_WIDTH_FILL * resolution[0] / total_advance
        } else {
            f32::INFINITY
        };
        let height_scale = if line_height > 0.0 {
            TEXT_HEIGHT_FILL * resolution[1] / line_height
        } else {
            f32::INFINITY
        };
        let mut scale = width_scale.min(height_scale);
        if !scale.is_finite() {
            scale = 1.0;
        }

        Self {
            scale,
            origin: [
                (resolution[0] - total_advance * scale) * 0.5,
                (resolution[1] - line_height * scale) * 0.5,
            ],
            resolution,
        }
    }

    /// uv in [0,1]² with y up, to atlas-pixel coordinates relative to the line box
    pub fn font_space(&self, uv: [f32; 2]) -> [f32; 2] {
        let px = uv[0] * self.resolution[0];
        let py = (1.0 - uv[1]) * self.resolution[1];
        [
            (px - self.origin[0]) / self.scale,
            (py - self.origin[1]) / self.scale,
        ]
    }
}
