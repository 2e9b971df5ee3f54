use crate::{
    error::{OutwardError, OutwardResult},
    focus::CenterOfFocus,
};

/// Padding added around the input image to reach the output dimensions.
///
/// Invariant: `left + input_width + right == out_width` and
/// `top + input_height + bottom == out_height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Expansion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Expansion {
    /// Top-left corner of the pasted input region on the canvas.
    pub fn origin(&self) -> (u32, u32) {
        (self.left, self.top)
    }
}

/// Split the growth on each axis so the center of focus stays visually
/// centered in the final canvas: a focus left-of-center sends more growth to
/// the right, and symmetrically for the vertical axis. Zero growth on an
/// axis yields zero padding on both of its sides.
///
/// Fails with an invalid-dimensions error when an output dimension is
/// smaller than the corresponding input dimension.
pub fn calculate_expansion(
    focus: CenterOfFocus,
    input_width: u32,
    input_height: u32,
    out_width: u32,
    out_height: u32,
) -> OutwardResult<Expansion> {
    if input_width == 0 || input_height == 0 {
        return Err(OutwardError::invalid_dimensions(
            "input width/height must be non-zero",
        ));
    }
    if out_width < input_width || out_height < input_height {
        return Err(OutwardError::invalid_dimensions(format!(
            "output {out_width}x{out_height} is smaller than input {input_width}x{input_height}"
        )));
    }

    let growth_x = out_width - input_width;
    let growth_y = out_height - input_height;

    // u64 intermediates: growth * focus can exceed u32.
    let left = (u64::from(growth_x) * u64::from(focus.x) / u64::from(input_width)) as u32;
    let top = (u64::from(growth_y) * u64::from(focus.y) / u64::from(input_height)) as u32;

    Ok(Expansion {
        left,
        top,
        right: growth_x - left,
        bottom: growth_y - top,
    })
}

/// First square position: centered over the pasted input region on each
/// axis, floored at the canvas origin. With a square at least as large as
/// the input this lands the square straddling the inner boundary between
/// the input and the expanded area, so the first inpainting call sees
/// maximal real context.
///
/// The result may overhang the far canvas edge for extreme expansions; the
/// planner clamps it into bounds.
pub fn initial_square_position(
    expansion: Expansion,
    square: u32,
    input_width: u32,
    input_height: u32,
) -> (u32, u32) {
    let x = i64::from(expansion.left) - (i64::from(square) - i64::from(input_width)).div_euclid(2);
    let y = i64::from(expansion.top) - (i64::from(square) - i64::from(input_height)).div_euclid(2);
    (x.max(0) as u32, y.max(0) as u32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Advance a square by `step` pixels along `direction`, clamping at the
/// canvas edges so the full square stays on-canvas. Returns `None` when the
/// clamped move does not change the position: the boundary signal that tells
/// the planner the direction is exhausted.
///
/// `step <= square` is a precondition enforced by parameter validation, not
/// here.
pub fn move_square(
    pos: (u32, u32),
    direction: Direction,
    step: u32,
    out_width: u32,
    out_height: u32,
    square: u32,
) -> Option<(u32, u32)> {
    let (x, y) = pos;
    let moved = match direction {
        Direction::Up => (x, y.saturating_sub(step)),
        Direction::Down => (x, y.saturating_add(step).min(out_height.saturating_sub(square))),
        Direction::Left => (x.saturating_sub(step), y),
        Direction::Right => (x.saturating_add(step).min(out_width.saturating_sub(square)), y),
    };
    (moved != pos).then_some(moved)
}

/// Side of the input whose inner boundary anchors a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

/// Priority order for picking the anchor side when several sides have
/// nonzero expansion: left, then top, then right, then bottom.
pub const START_SIDE_PRIORITY: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

/// First side in [`START_SIDE_PRIORITY`] with nonzero expansion, or `None`
/// when input and output dimensions are equal.
pub fn anchor_side(expansion: Expansion) -> Option<Side> {
    START_SIDE_PRIORITY.into_iter().find(|side| match side {
        Side::Left => expansion.left > 0,
        Side::Top => expansion.top > 0,
        Side::Right => expansion.right > 0,
        Side::Bottom => expansion.bottom > 0,
    })
}
