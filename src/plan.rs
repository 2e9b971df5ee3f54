use indexmap::IndexMap;

use crate::{
    error::OutwardError,
    geometry::{Direction, move_square},
};

/// A square region of the canvas to be painted by one inpainting call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Square {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl Square {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }

    pub fn right(&self) -> u32 {
        self.x + self.size
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.size
    }

    pub fn rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }
}

/// Direction label of a plan entry: the initial square, one of the four
/// axis legs, or one of the four quadrant sweeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Leg {
    Init,
    Up,
    Left,
    Right,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

/// Execution order of the legs inside a plan.
pub const LEG_ORDER: [Leg; 9] = [
    Leg::Init,
    Leg::Up,
    Leg::Left,
    Leg::Right,
    Leg::Down,
    Leg::UpLeft,
    Leg::UpRight,
    Leg::DownLeft,
    Leg::DownRight,
];

impl Leg {
    pub fn as_str(self) -> &'static str {
        match self {
            Leg::Init => "init",
            Leg::Up => "up",
            Leg::Left => "left",
            Leg::Right => "right",
            Leg::Down => "down",
            Leg::UpLeft => "up_left",
            Leg::UpRight => "up_right",
            Leg::DownLeft => "down_left",
            Leg::DownRight => "down_right",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Leg {
    type Err = OutwardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LEG_ORDER
            .into_iter()
            .find(|leg| leg.as_str() == s)
            .ok_or_else(|| OutwardError::validation(format!("unknown plan leg '{s}'")))
    }
}

/// Stable identity of a plan entry, e.g. `up_left-3`. Keys survive
/// serialization round-trips so a later resume can name completed entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SquareKey {
    pub leg: Leg,
    pub index: usize,
}

impl SquareKey {
    pub fn new(leg: Leg, index: usize) -> Self {
        Self { leg, index }
    }
}

impl std::fmt::Display for SquareKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.leg, self.index)
    }
}

impl std::str::FromStr for SquareKey {
    type Err = OutwardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (leg, index) = s
            .rsplit_once('-')
            .ok_or_else(|| OutwardError::validation(format!("malformed square key '{s}'")))?;
        Ok(Self {
            leg: leg.parse()?,
            index: index
                .parse()
                .map_err(|_| OutwardError::validation(format!("malformed square key '{s}'")))?,
        })
    }
}

/// The complete, ordered painting plan. Built once, immutable afterwards;
/// iteration order is execution order.
#[derive(Clone, Debug, Default)]
pub struct PlannedSquares {
    entries: IndexMap<SquareKey, Square>,
}

impl PlannedSquares {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SquareKey, &Square)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &SquareKey) -> Option<&Square> {
        self.entries.get(key)
    }

    pub fn get_index(&self, index: usize) -> Option<(&SquareKey, &Square)> {
        self.entries.get_index(index)
    }
}

/// Build the full painting plan.
///
/// The sweep starts at `initial` (clamped so the square stays on-canvas),
/// walks the four axis legs in the fixed order up, left, right, down until
/// each signals its boundary, then fills the four quadrants as products of
/// the horizontal and vertical legs, rows in vertical-leg order.
///
/// Properties the rest of the engine relies on:
/// - the union of all planned squares covers every canvas pixel;
/// - entries overlap by `square - step` pixels, on purpose, so each call
///   sees already-resolved neighbors as context;
/// - identical inputs produce the identical sequence and keys.
pub fn create_planned_squares(
    initial: (u32, u32),
    square: u32,
    step: u32,
    out_width: u32,
    out_height: u32,
) -> PlannedSquares {
    let initial = (
        initial.0.min(out_width.saturating_sub(square)),
        initial.1.min(out_height.saturating_sub(square)),
    );

    let walk = |direction: Direction| -> Vec<(u32, u32)> {
        let mut positions = Vec::new();
        let mut pos = initial;
        while let Some(next) = move_square(pos, direction, step, out_width, out_height, square) {
            positions.push(next);
            pos = next;
        }
        positions
    };

    let up = walk(Direction::Up);
    let left = walk(Direction::Left);
    let right = walk(Direction::Right);
    let down = walk(Direction::Down);

    let mut entries = IndexMap::new();
    entries.insert(
        SquareKey::new(Leg::Init, 0),
        Square::new(initial.0, initial.1, square),
    );
    push_leg(&mut entries, Leg::Up, square, &up);
    push_leg(&mut entries, Leg::Left, square, &left);
    push_leg(&mut entries, Leg::Right, square, &right);
    push_leg(&mut entries, Leg::Down, square, &down);
    push_leg(&mut entries, Leg::UpLeft, square, &quadrant(&up, &left));
    push_leg(&mut entries, Leg::UpRight, square, &quadrant(&up, &right));
    push_leg(&mut entries, Leg::DownLeft, square, &quadrant(&down, &left));
    push_leg(&mut entries, Leg::DownRight, square, &quadrant(&down, &right));

    PlannedSquares { entries }
}

fn push_leg(
    entries: &mut IndexMap<SquareKey, Square>,
    leg: Leg,
    size: u32,
    positions: &[(u32, u32)],
) {
    for (index, &(x, y)) in positions.iter().enumerate() {
        entries.insert(SquareKey::new(leg, index), Square::new(x, y, size));
    }
}

/// Quadrant positions: x from the horizontal leg, y from the vertical leg.
fn quadrant(vertical: &[(u32, u32)], horizontal: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut positions = Vec::with_capacity(vertical.len() * horizontal.len());
    for &(_, y) in vertical {
        for &(x, _) in horizontal {
            positions.push((x, y));
        }
    }
    positions
}
