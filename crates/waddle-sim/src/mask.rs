// ABOUTME: Target validity lookup used by the host-side particle step.
// ABOUTME: The text mask decides which band positions are inside a glyph.

use waddle_text::TextMask;

pub trait TargetMask: Sync {
    /// Whether a y-up uv position lies inside the rendered text
    fn covers(&self, uv: [f32; 2]) -> bool;
}

impl TargetMask for TextMask {
    fn covers(&self, uv: [f32; 2]) -> bool {
        TextMask::covers(self, uv)
    }
}

/// Accepts every target
#[cfg(test)]
pub struct OpenMask;

#[cfg(test)]
impl TargetMask for OpenMask {
    fn covers(&self, _uv: [f32; 2]) -> bool {
        true
    }
}

/// Boolean grid sampled at texel centers, row 0 at the top
#[cfg(test)]
pub struct GridMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

#[cfg(test)]
impl GridMask {
    pub fn from_fn(width: u32, height: u32, inside: impl Fn(f32, f32) -> bool) -> Self {
        let mut cells = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            let v = 1.0 - (row as f32 + 0.5) / height as f32;
            for col in 0..width {
                cells.push(inside((col as f32 + 0.5) / width as f32, v));
            }
        }
        Self { width, height, cells }
    }
}

#[cfg(test)]
impl TargetMask for GridMask {
    fn covers(&self, uv: [f32; 2]) -> bool {
        let x = ((uv[0] * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = (((1.0 - uv[1]) * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.cells[(y as u32 * self.width + x as u32) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_mask_covers_nothing() {
        let mask = TextMask::empty(8, 8);
        assert!(!TargetMask::covers(&mask, [0.5, 0.5]));
    }

    #[test]
    fn test_grid_mask_orientation() {
        // Top half inside: high v is the top of the screen
        let mask = GridMask::from_fn(4, 4, |_, v| v > 0.5);
        assert!(mask.covers([0.5, 0.9]));
        assert!(!mask.covers([0.5, 0.1]));
    }
}
