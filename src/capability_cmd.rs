use std::{
    path::PathBuf,
    process::{Command, Output, Stdio},
};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    capability::{Captioner, InpaintError, InpaintRequest, Inpainter},
    error::{OutwardError, OutwardResult},
};

/// Environment variable carrying the prompt to an inpaint command.
pub const PROMPT_ENV: &str = "OUTWARD_PROMPT";
/// Environment variable carrying the square side length to an inpaint command.
pub const SIZE_ENV: &str = "OUTWARD_SIZE";

/// Inpainter driving an external command. The region is piped to the
/// child's stdin as PNG, the prompt and size are exported via
/// [`PROMPT_ENV`] and [`SIZE_ENV`], and the painted PNG is read back
/// from its stdout.
#[derive(Clone, Debug)]
pub struct CommandInpainter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInpainter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Parses a whitespace-separated command line: the first token is the
    /// program, the rest are arguments.
    pub fn from_spec(spec: &str) -> OutwardResult<Self> {
        let mut parts = spec.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| OutwardError::validation("empty inpaint command"))?;
        Ok(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Inpainter for CommandInpainter {
    fn inpaint(&mut self, request: &InpaintRequest<'_>) -> Result<RgbaImage, InpaintError> {
        let png = encode_png(request.region)
            .map_err(|e| InpaintError::backend(format!("failed to encode region as png: {e}")))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(PROMPT_ENV, request.prompt)
            .env(SIZE_ENV, request.size.to_string());

        let output = run_piped(cmd, png).map_err(|e| {
            InpaintError::backend(format!(
                "failed to run inpaint command '{}': {e}",
                self.program.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InpaintError::backend(format!(
                "'{}' exited with status {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let decoded = image::load_from_memory(&output.stdout).map_err(|e| {
            InpaintError::contract(format!(
                "'{}' did not return a decodable image: {e}",
                self.program.display()
            ))
        })?;

        Ok(decoded.to_rgba8())
    }
}

/// Captioner driving an external command. The image is piped to the
/// child's stdin as PNG; the description is its trimmed stdout.
#[derive(Clone, Debug)]
pub struct CommandCaptioner {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCaptioner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn from_spec(spec: &str) -> OutwardResult<Self> {
        let mut parts = spec.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| OutwardError::validation("empty caption command"))?;
        Ok(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Captioner for CommandCaptioner {
    fn describe(&mut self, image: &RgbaImage) -> OutwardResult<String> {
        let png = encode_png(image).context("failed to encode image for caption command")?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        let output = run_piped(cmd, png)
            .with_context(|| format!("failed to run caption command '{}'", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OutwardError::detection(format!(
                "'{}' exited with status {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(OutwardError::detection(format!(
                "'{}' returned no text",
                self.program.display()
            )));
        }

        Ok(text)
    }
}

fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Runs the command with all three standard streams piped, feeding
/// `payload` to stdin from a helper thread so a child that fills its
/// stdout pipe before draining stdin cannot deadlock us.
fn run_piped(mut cmd: Command, payload: Vec<u8>) -> std::io::Result<Output> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("failed to open child stdin (unexpected)"))?;

    let writer = std::thread::spawn(move || {
        use std::io::Write as _;
        stdin.write_all(&payload)
    });

    let output = child.wait_with_output()?;

    // The child may exit without draining stdin; the writer's broken-pipe
    // result is irrelevant once the output is collected.
    if writer.join().is_err() {
        return Err(std::io::Error::other("stdin writer thread panicked"));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_spec_splits_program_and_args() {
        let inpainter = CommandInpainter::from_spec("python paint.py --model sd").unwrap();
        assert_eq!(inpainter.program, PathBuf::from("python"));
        assert_eq!(inpainter.args, ["paint.py", "--model", "sd"]);

        assert!(CommandInpainter::from_spec("   ").is_err());
    }

    #[test]
    #[cfg(unix)]
    fn cat_round_trips_the_region() {
        let region = image::RgbaImage::from_fn(16, 16, |x, y| image::Rgba([x as u8, y as u8, 7, 255]));
        let request = InpaintRequest {
            region: &region,
            prompt: "sky",
            size: 16,
        };
        let result = CommandInpainter::new("/bin/cat").inpaint(&request).unwrap();
        assert_eq!(result, region);
    }

    #[test]
    #[cfg(unix)]
    fn failing_command_reports_stderr() {
        let region = image::RgbaImage::new(4, 4);
        let request = InpaintRequest {
            region: &region,
            prompt: "sky",
            size: 4,
        };
        let err = CommandInpainter::new("/bin/sh")
            .arg("-c")
            .arg("cat >/dev/null; echo nope >&2; exit 3")
            .inpaint(&request)
            .unwrap_err();
        assert_eq!(err.kind, crate::capability::InpaintErrorKind::Backend);
        assert!(err.message.contains("nope"), "message: {}", err.message);
    }

    #[test]
    #[cfg(unix)]
    fn undecodable_output_is_a_contract_violation() {
        let region = image::RgbaImage::new(4, 4);
        let request = InpaintRequest {
            region: &region,
            prompt: "sky",
            size: 4,
        };
        let err = CommandInpainter::new("/bin/sh")
            .arg("-c")
            .arg("cat >/dev/null; echo not-a-png")
            .inpaint(&request)
            .unwrap_err();
        assert_eq!(err.kind, crate::capability::InpaintErrorKind::Contract);
    }

    #[test]
    #[cfg(unix)]
    fn caption_command_text_is_trimmed() {
        let image = image::RgbaImage::new(4, 4);
        let text = CommandCaptioner::new("/bin/sh")
            .arg("-c")
            .arg("cat >/dev/null; echo '  a quiet harbor  '")
            .describe(&image)
            .unwrap();
        assert_eq!(text, "a quiet harbor");
    }

    #[test]
    #[cfg(unix)]
    fn empty_caption_is_an_error() {
        let image = image::RgbaImage::new(4, 4);
        let err = CommandCaptioner::new("/bin/sh")
            .arg("-c")
            .arg("cat >/dev/null")
            .describe(&image)
            .unwrap_err();
        assert!(err.to_string().contains("returned no text"), "got: {err}");
    }
}
