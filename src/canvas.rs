use std::path::Path;

use anyhow::Context as _;
use image::{Rgba, RgbaImage, imageops};

use crate::{
    error::{OutwardError, OutwardResult},
    plan::Square,
};

/// The mutable RGBA raster of the final output dimensions.
///
/// Created fully transparent. Written to only by the initial input paste
/// and by each successful square result; transparency therefore marks the
/// not-yet-painted area, which downstream inpainting backends treat as the
/// implicit mask.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> OutwardResult<Self> {
        if width == 0 || height == 0 {
            return Err(OutwardError::invalid_dimensions(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Paste `src` with its top-left corner at `(x, y)`, clipping whatever
    /// falls outside the canvas.
    pub fn paste(&mut self, src: &RgbaImage, x: u32, y: u32) {
        imageops::replace(&mut self.image, src, i64::from(x), i64::from(y));
    }

    /// The square's region as an exactly `size x size` image. Where the
    /// square overhangs the canvas, the crop is padded with transparent
    /// pixels.
    pub fn crop_padded(&self, square: Square) -> RgbaImage {
        let view =
            imageops::crop_imm(&self.image, square.x, square.y, square.size, square.size)
                .to_image();
        if view.dimensions() == (square.size, square.size) {
            return view;
        }
        let mut padded = RgbaImage::from_pixel(square.size, square.size, Rgba([0, 0, 0, 0]));
        imageops::replace(&mut padded, &view, 0, 0);
        padded
    }

    /// Pixel readback of an arbitrary region, clamped to the canvas bounds.
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
        imageops::crop_imm(&self.image, x, y, width, height).to_image()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn save_png(&self, path: &Path) -> OutwardResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Decode an image file into RGBA8.
pub fn load_rgba(path: &Path) -> OutwardResult<RgbaImage> {
    let decoded =
        image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        })
    }

    #[test]
    fn paste_then_read_back_returns_input_unchanged() {
        let input = gradient(64, 48);
        let mut canvas = Canvas::new(200, 100).unwrap();
        canvas.paste(&input, 120, 30);
        assert_eq!(canvas.region(120, 30, 64, 48), input);
    }

    #[test]
    fn crop_pads_overhanging_square_with_transparency() {
        let mut canvas = Canvas::new(100, 100).unwrap();
        canvas.paste(&gradient(100, 100), 0, 0);

        let crop = canvas.crop_padded(Square::new(60, 60, 64));
        assert_eq!(crop.dimensions(), (64, 64));
        // On-canvas part survives, overhang is transparent.
        assert_eq!(crop.get_pixel(0, 0), canvas.as_image().get_pixel(60, 60));
        assert_eq!(crop.get_pixel(63, 63), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 0).is_err());
    }
}
