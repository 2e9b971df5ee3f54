#![forbid(unsafe_code)]

pub mod canvas;
pub mod capability;
pub mod capability_cmd;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod plan;
pub mod prompt;
pub mod session;
pub mod sidecar;
pub mod snapshot;

pub use canvas::{Canvas, load_rgba};
pub use capability::{
    Captioner, FaceDetector, FillInpainter, InpaintError, InpaintErrorKind, InpaintRequest,
    Inpainter, NoCaptioner, NoDetection, SubjectDetector,
};
pub use capability_cmd::{CommandCaptioner, CommandInpainter, PROMPT_ENV, SIZE_ENV};
pub use error::{OutwardError, OutwardResult};
pub use focus::{CenterOfFocus, resolve_center_of_focus, subject_in_square};
pub use geometry::{
    Direction, Expansion, START_SIDE_PRIORITY, Side, anchor_side, calculate_expansion,
    initial_square_position, move_square,
};
pub use plan::{LEG_ORDER, Leg, PlannedSquares, Square, SquareKey, create_planned_squares};
pub use prompt::{DEFAULT_FALLBACK_PROMPT, PromptState};
pub use session::{
    Collaborators, OutpaintParams, OutpaintSession, RunStats, SquareSize, SquareState,
};
pub use sidecar::SceneSidecar;
pub use snapshot::{FsSnapshots, NullSnapshots, SnapshotSink};
