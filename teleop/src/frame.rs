use crate::error::FrameError;

/// Counter-clockwise rotation applied to a frame before it is shown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Packed RGB8 image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(Self::BYTES_PER_PIXEL))
            .ok_or(FrameError::TooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Frame {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * Self::BYTES_PER_PIXEL;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    pub fn rotated(&self, rotation: Rotation) -> Frame {
        let (width, height) = match rotation {
            Rotation::Deg0 | Rotation::Deg180 => (self.width, self.height),
            Rotation::Deg90 | Rotation::Deg270 => (self.height, self.width),
        };
        if rotation == Rotation::Deg0 {
            return self.clone();
        }

        let mut pixels = vec![0; self.pixels.len()];
        for y in 0..height {
            for x in 0..width {
                // source coordinate of destination (x, y)
                let (sx, sy) = match rotation {
                    Rotation::Deg0 => (x, y),
                    Rotation::Deg90 => (self.width - 1 - y, x),
                    Rotation::Deg180 => (self.width - 1 - x, self.height - 1 - y),
                    Rotation::Deg270 => (y, self.height - 1 - x),
                };
                let src = (sy * self.width + sx) * Self::BYTES_PER_PIXEL;
                let dst = (y * width + x) * Self::BYTES_PER_PIXEL;
                pixels[dst..dst + Self::BYTES_PER_PIXEL]
                    .copy_from_slice(&self.pixels[src..src + Self::BYTES_PER_PIXEL]);
            }
        }
        Frame {
            width,
            height,
            pixels,
        }
    }
}
