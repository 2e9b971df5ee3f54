use image::RgbaImage;
use kurbo::Rect;

use crate::error::{OutwardError, OutwardResult};

/// One inpainting request: the cropped canvas region to repaint and the
/// prompt guiding it. The region's alpha channel is the implicit mask:
/// transparent pixels are to be painted, opaque pixels are context.
#[derive(Clone, Debug)]
pub struct InpaintRequest<'a> {
    pub region: &'a RgbaImage,
    pub prompt: &'a str,
    /// Side length the result must match exactly.
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InpaintErrorKind {
    RateLimit,
    Network,
    InvalidPrompt,
    /// The backend answered, but broke the interface contract (wrong size,
    /// undecodable image).
    Contract,
    Backend,
}

impl InpaintErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate limit",
            Self::Network => "network error",
            Self::InvalidPrompt => "prompt rejected",
            Self::Contract => "contract violation",
            Self::Backend => "backend error",
        }
    }
}

/// Failure of one inpainting call. Always fatal for the run that hit it.
#[derive(thiserror::Error, Debug)]
#[error("{}: {message}", .kind.as_str())]
pub struct InpaintError {
    pub kind: InpaintErrorKind,
    pub message: String,
}

impl InpaintError {
    pub fn new(kind: InpaintErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(InpaintErrorKind::RateLimit, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(InpaintErrorKind::Network, message)
    }

    pub fn invalid_prompt(message: impl Into<String>) -> Self {
        Self::new(InpaintErrorKind::InvalidPrompt, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(InpaintErrorKind::Contract, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(InpaintErrorKind::Backend, message)
    }
}

/// External generative-inpainting capability.
pub trait Inpainter {
    /// Repaint the request's region, returning an image of exactly
    /// `size x size` pixels in the same color model.
    fn inpaint(&mut self, request: &InpaintRequest<'_>) -> Result<RgbaImage, InpaintError>;
}

/// Subject (human) detector, invoked once per run on the input image.
/// Boxes are in input-image pixel coordinates.
pub trait SubjectDetector {
    fn detect(&mut self, image: &RgbaImage) -> OutwardResult<Vec<Rect>>;
}

/// Face detector seeding the center of focus.
pub trait FaceDetector {
    fn detect_face(&mut self, image: &RgbaImage) -> OutwardResult<Option<Rect>>;
}

/// Descriptive captioner, invoked at most once per run and cached.
pub trait Captioner {
    fn describe(&mut self, image: &RgbaImage) -> OutwardResult<String>;
}

/// Detector that never finds anything. The default when subject steering
/// is off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDetection;

impl SubjectDetector for NoDetection {
    fn detect(&mut self, _image: &RgbaImage) -> OutwardResult<Vec<Rect>> {
        Ok(Vec::new())
    }
}

impl FaceDetector for NoDetection {
    fn detect_face(&mut self, _image: &RgbaImage) -> OutwardResult<Option<Rect>> {
        Ok(None)
    }
}

/// Captioner that reports itself unavailable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCaptioner;

impl Captioner for NoCaptioner {
    fn describe(&mut self, _image: &RgbaImage) -> OutwardResult<String> {
        Err(OutwardError::detection("no captioner configured"))
    }
}

/// Inpainter that fills the masked (transparent) pixels with one solid
/// color and keeps opaque context pixels. For geometry previews and
/// tests; makes no external call.
#[derive(Clone, Copy, Debug)]
pub struct FillInpainter {
    pub rgba: [u8; 4],
}

impl FillInpainter {
    pub fn new(rgba: [u8; 4]) -> Self {
        Self { rgba }
    }
}

impl Inpainter for FillInpainter {
    fn inpaint(&mut self, request: &InpaintRequest<'_>) -> Result<RgbaImage, InpaintError> {
        let fill = image::Rgba(self.rgba);
        Ok(RgbaImage::from_fn(request.size, request.size, |x, y| {
            match request.region.get_pixel_checked(x, y) {
                Some(p) if p.0[3] != 0 => *p,
                _ => fill,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_kind() {
        assert_eq!(
            InpaintError::rate_limit("slow down").to_string(),
            "rate limit: slow down"
        );
        assert_eq!(
            InpaintError::contract("wrong size").to_string(),
            "contract violation: wrong size"
        );
    }

    #[test]
    fn fill_inpainter_honors_requested_size() {
        let region = RgbaImage::new(8, 8);
        let request = InpaintRequest {
            region: &region,
            prompt: "anything",
            size: 32,
        };
        let result = FillInpainter::new([1, 2, 3, 255]).inpaint(&request).unwrap();
        assert_eq!(result.dimensions(), (32, 32));
        assert_eq!(result.get_pixel(31, 31), &image::Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn fill_inpainter_keeps_opaque_context_pixels() {
        let mut region = RgbaImage::new(4, 4);
        region.put_pixel(1, 1, image::Rgba([9, 8, 7, 255]));
        let request = InpaintRequest {
            region: &region,
            prompt: "anything",
            size: 4,
        };
        let result = FillInpainter::new([1, 1, 1, 255]).inpaint(&request).unwrap();
        assert_eq!(result.get_pixel(1, 1), &image::Rgba([9, 8, 7, 255]));
        assert_eq!(result.get_pixel(0, 0), &image::Rgba([1, 1, 1, 255]));
    }
}
