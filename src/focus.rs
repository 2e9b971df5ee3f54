use kurbo::{Rect, Vec2};

use crate::{geometry::Expansion, plan::Square};

/// The pixel the expansion is biased to keep visually centered. Always a
/// coordinate inside the input image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CenterOfFocus {
    pub x: u32,
    pub y: u32,
}

impl CenterOfFocus {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn geometric_center(input_width: u32, input_height: u32) -> Self {
        Self {
            x: input_width / 2,
            y: input_height / 2,
        }
    }
}

/// Center of the detected face box when one is available, else the input's
/// geometric center. The result is clamped into the input bounds.
pub fn resolve_center_of_focus(
    face: Option<Rect>,
    input_width: u32,
    input_height: u32,
) -> CenterOfFocus {
    let Some(face) = face else {
        return CenterOfFocus::geometric_center(input_width, input_height);
    };
    let center = face.center();
    CenterOfFocus {
        x: (center.x.floor().max(0.0) as u32).min(input_width.saturating_sub(1)),
        y: (center.y.floor().max(0.0) as u32).min(input_height.saturating_sub(1)),
    }
}

/// Translate detector boxes from input-image coordinates into canvas
/// coordinates. Done once at setup, after the expansion is known.
pub fn offset_boxes(boxes: &[Rect], expansion: Expansion) -> Vec<Rect> {
    let shift = Vec2::new(f64::from(expansion.left), f64::from(expansion.top));
    boxes.iter().map(|b| *b + shift).collect()
}

/// True iff the square shares positive-area overlap with at least one
/// subject box. Disjoint and merely edge-touching rectangles do not count.
pub fn subject_in_square(square: Square, boxes: &[Rect]) -> bool {
    let region = square.rect();
    boxes.iter().any(|b| !region.intersect(*b).is_zero_area())
}
