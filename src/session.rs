use image::RgbaImage;
use kurbo::Rect;
use tracing::{debug, info, warn};

use crate::{
    canvas::Canvas,
    capability::{
        Captioner, FaceDetector, InpaintError, InpaintRequest, Inpainter, NoCaptioner, NoDetection,
        SubjectDetector,
    },
    error::{OutwardError, OutwardResult},
    focus::{CenterOfFocus, offset_boxes, resolve_center_of_focus, subject_in_square},
    geometry::{Expansion, anchor_side, calculate_expansion, initial_square_position},
    plan::{PlannedSquares, Square, create_planned_squares},
    prompt::PromptState,
    snapshot::SnapshotSink,
};

/// Square side lengths the inpainting backends accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SquareSize {
    S256,
    S512,
    S1024,
}

impl SquareSize {
    pub fn from_pixels(pixels: u32) -> OutwardResult<Self> {
        match pixels {
            256 => Ok(Self::S256),
            512 => Ok(Self::S512),
            1024 => Ok(Self::S1024),
            other => Err(OutwardError::invalid_step(format!(
                "square size must be 256, 512 or 1024, got {other}"
            ))),
        }
    }

    pub fn pixels(self) -> u32 {
        match self {
            Self::S256 => 256,
            Self::S512 => 512,
            Self::S1024 => 1024,
        }
    }
}

/// Caller-facing knobs for one outpainting run.
#[derive(Clone, Debug)]
pub struct OutpaintParams {
    pub out_width: u32,
    pub out_height: u32,
    pub square: SquareSize,
    /// Scroll step in pixels. Defaults to half the square side.
    pub step: Option<u32>,
    pub prompt: Option<String>,
    pub fallback: Option<String>,
    /// Steer focus and prompt choice with face/subject detection.
    pub humans: bool,
}

impl OutpaintParams {
    pub fn new(out_width: u32, out_height: u32, square: SquareSize) -> Self {
        Self {
            out_width,
            out_height,
            square,
            step: None,
            prompt: None,
            fallback: None,
            humans: false,
        }
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_humans(mut self, humans: bool) -> Self {
        self.humans = humans;
        self
    }

    pub fn step_pixels(&self) -> u32 {
        self.step.unwrap_or(self.square.pixels() / 2)
    }

    pub fn validate(&self, input_width: u32, input_height: u32) -> OutwardResult<()> {
        if input_width == 0 || input_height == 0 {
            return Err(OutwardError::invalid_dimensions(
                "input width/height must be non-zero",
            ));
        }
        if self.out_width < input_width || self.out_height < input_height {
            return Err(OutwardError::invalid_dimensions(format!(
                "output {}x{} is smaller than input {input_width}x{input_height}",
                self.out_width, self.out_height
            )));
        }
        let step = self.step_pixels();
        if step == 0 {
            return Err(OutwardError::invalid_step("step must be non-zero"));
        }
        if step > self.square.pixels() {
            return Err(OutwardError::invalid_step(format!(
                "step {step} exceeds square size {}",
                self.square.pixels()
            )));
        }
        if let Some(prompt) = &self.prompt
            && prompt.trim().is_empty()
        {
            return Err(OutwardError::validation("prompt must not be blank"));
        }
        if let Some(fallback) = &self.fallback
            && fallback.trim().is_empty()
        {
            return Err(OutwardError::validation("fallback prompt must not be blank"));
        }
        Ok(())
    }
}

/// The injected capabilities a session drives. Only the inpainter is
/// mandatory; detection and captioning default to inert implementations.
pub struct Collaborators {
    pub inpainter: Box<dyn Inpainter>,
    pub faces: Box<dyn FaceDetector>,
    pub subjects: Box<dyn SubjectDetector>,
    pub captioner: Box<dyn Captioner>,
}

impl Collaborators {
    pub fn new(inpainter: Box<dyn Inpainter>) -> Self {
        Self {
            inpainter,
            faces: Box::new(NoDetection),
            subjects: Box::new(NoDetection),
            captioner: Box::new(NoCaptioner),
        }
    }

    pub fn with_faces(mut self, faces: Box<dyn FaceDetector>) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_subjects(mut self, subjects: Box<dyn SubjectDetector>) -> Self {
        self.subjects = subjects;
        self
    }

    pub fn with_captioner(mut self, captioner: Box<dyn Captioner>) -> Self {
        self.captioner = captioner;
        self
    }
}

/// Lifecycle of one planned square during [`OutpaintSession::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SquareState {
    Pending,
    InProgress,
    Done,
    Failed,
}

/// Outcome counters for a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub planned: usize,
    pub painted: usize,
    /// Squares fully inside the pasted input, left untouched.
    pub skipped: usize,
}

/// One outpainting run: geometry resolved, plan fixed, canvas primed with
/// the input image. Construction performs all detection and captioning
/// up front; [`run`](Self::run) afterwards only talks to the inpainter.
pub struct OutpaintSession {
    params: OutpaintParams,
    collaborators: Collaborators,
    input_width: u32,
    input_height: u32,
    center_of_focus: CenterOfFocus,
    expansion: Expansion,
    subject_boxes: Vec<Rect>,
    prompts: PromptState,
    plan: PlannedSquares,
    states: Vec<SquareState>,
    canvas: Canvas,
}

impl OutpaintSession {
    pub fn new(
        input: RgbaImage,
        params: OutpaintParams,
        mut collaborators: Collaborators,
    ) -> OutwardResult<Self> {
        let (input_width, input_height) = input.dimensions();
        params.validate(input_width, input_height)?;

        let face = if params.humans {
            match collaborators.faces.detect_face(&input) {
                Ok(face) => face,
                Err(err) => {
                    warn!(error = %err, "face detection unavailable, using geometric center");
                    None
                }
            }
        } else {
            None
        };
        let center_of_focus = resolve_center_of_focus(face, input_width, input_height);

        let expansion = calculate_expansion(
            center_of_focus,
            input_width,
            input_height,
            params.out_width,
            params.out_height,
        )?;

        let subject_boxes = if params.humans {
            match collaborators.subjects.detect(&input) {
                Ok(boxes) => offset_boxes(&boxes, expansion),
                Err(err) => {
                    warn!(error = %err, "subject detection unavailable, assuming empty scene");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let prompts = PromptState::prepare(
            params.prompt.as_deref(),
            params.fallback.as_deref(),
            &input,
            collaborators.captioner.as_mut(),
        )?;

        let mut canvas = Canvas::new(params.out_width, params.out_height)?;
        canvas.paste(&input, expansion.left, expansion.top);

        let initial =
            initial_square_position(expansion, params.square.pixels(), input_width, input_height);
        let plan = create_planned_squares(
            initial,
            params.square.pixels(),
            params.step_pixels(),
            params.out_width,
            params.out_height,
        );
        let states = vec![SquareState::Pending; plan.len()];

        debug!(
            input_width,
            input_height,
            out_width = params.out_width,
            out_height = params.out_height,
            anchor = ?anchor_side(expansion),
            squares = plan.len(),
            "session prepared"
        );

        Ok(Self {
            params,
            collaborators,
            input_width,
            input_height,
            center_of_focus,
            expansion,
            subject_boxes,
            prompts,
            plan,
            states,
            canvas,
        })
    }

    /// Paints every planned square in plan order. The first inpainting
    /// failure aborts the run; the error names the failing square and
    /// everything painted before it stays on the canvas.
    #[tracing::instrument(skip(self, sink))]
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> OutwardResult<RunStats> {
        let mut stats = RunStats {
            planned: self.plan.len(),
            ..RunStats::default()
        };

        for index in 0..self.plan.len() {
            let Some((&key, &square)) = self.plan.get_index(index) else {
                break;
            };
            self.states[index] = SquareState::InProgress;

            if self.enclosed_in_input(square) {
                debug!(square = %key, "skipping square inside the input image");
                self.states[index] = SquareState::Done;
                stats.skipped += 1;
                continue;
            }

            let subject_present = subject_in_square(square, &self.subject_boxes);
            let prompt = self.prompts.compose(subject_present);
            let region = self.canvas.crop_padded(square);
            info!(
                square = %key,
                x = square.x,
                y = square.y,
                subject = subject_present,
                "inpainting square"
            );

            let request = InpaintRequest {
                region: &region,
                prompt: &prompt,
                size: square.size,
            };
            let painted = match self.collaborators.inpainter.inpaint(&request) {
                Ok(painted) => painted,
                Err(source) => {
                    self.states[index] = SquareState::Failed;
                    return Err(OutwardError::inpaint(key, index, source));
                }
            };
            if painted.dimensions() != (square.size, square.size) {
                self.states[index] = SquareState::Failed;
                let (w, h) = painted.dimensions();
                return Err(OutwardError::inpaint(
                    key,
                    index,
                    InpaintError::contract(format!(
                        "expected a {0}x{0} result, got {w}x{h}",
                        square.size
                    )),
                ));
            }

            self.canvas.paste(&painted, square.x, square.y);
            self.states[index] = SquareState::Done;
            stats.painted += 1;
            sink.snapshot(&key, &self.canvas)?;
        }

        info!(
            planned = stats.planned,
            painted = stats.painted,
            skipped = stats.skipped,
            "outpainting complete"
        );
        Ok(stats)
    }

    /// True when the square lies fully inside the pasted input region, so
    /// painting it would only repaint original pixels.
    fn enclosed_in_input(&self, square: Square) -> bool {
        let (left, top) = self.expansion.origin();
        square.x >= left
            && square.y >= top
            && square.right() <= left + self.input_width
            && square.bottom() <= top + self.input_height
    }

    pub fn plan(&self) -> &PlannedSquares {
        &self.plan
    }

    pub fn expansion(&self) -> Expansion {
        self.expansion
    }

    pub fn center_of_focus(&self) -> CenterOfFocus {
        self.center_of_focus
    }

    pub fn prompts(&self) -> &PromptState {
        &self.prompts
    }

    pub fn states(&self) -> &[SquareState] {
        &self.states
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FillInpainter;

    #[test]
    fn square_size_parses_only_supported_values() {
        assert_eq!(SquareSize::from_pixels(256).unwrap(), SquareSize::S256);
        assert_eq!(SquareSize::from_pixels(1024).unwrap().pixels(), 1024);
        assert!(SquareSize::from_pixels(300).is_err());
    }

    #[test]
    fn step_defaults_to_half_the_square() {
        let params = OutpaintParams::new(1024, 1024, SquareSize::S512);
        assert_eq!(params.step_pixels(), 256);
        assert_eq!(params.with_step(100).step_pixels(), 100);
    }

    #[test]
    fn validation_rejects_bad_geometry() {
        let params = OutpaintParams::new(1024, 1024, SquareSize::S512);
        assert!(params.validate(0, 100).is_err());
        assert!(params.validate(2000, 100).is_err());
        assert!(params.validate(512, 512).is_ok());

        let step_too_big = OutpaintParams::new(1024, 1024, SquareSize::S256).with_step(512);
        assert!(step_too_big.validate(512, 512).is_err());

        let zero_step = OutpaintParams::new(1024, 1024, SquareSize::S512).with_step(0);
        assert!(zero_step.validate(512, 512).is_err());

        let blank_prompt = OutpaintParams::new(1024, 1024, SquareSize::S512).with_prompt("  ");
        assert!(blank_prompt.validate(512, 512).is_err());
    }

    #[test]
    fn session_plans_one_square_for_tiny_canvases() {
        let input = RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255]));
        let params = OutpaintParams::new(8, 8, SquareSize::S256).with_prompt("dunes");
        let collaborators = Collaborators::new(Box::new(FillInpainter::new([1, 2, 3, 255])));
        let session = OutpaintSession::new(input, params, collaborators).unwrap();
        assert_eq!(session.plan().len(), 1);
        assert_eq!(session.states(), [SquareState::Pending]);
    }
}
