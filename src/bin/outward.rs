use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use outward::Captioner as _;

#[derive(Parser, Debug)]
#[command(name = "outward", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Outpaint an image onto a larger canvas.
    Run(RunArgs),
    /// Print the square plan as JSON without painting anything.
    Plan(PlanArgs),
    /// Print the scene description an outpainting run would use.
    Describe(DescribeArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input image (PNG, JPEG, ...).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path. Defaults to `<input>_outpainted-<W>x<H>.png`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output canvas width in pixels.
    #[arg(long)]
    width: u32,

    /// Output canvas height in pixels.
    #[arg(long)]
    height: u32,

    /// Prompt for squares showing people.
    #[arg(long)]
    prompt: Option<String>,

    /// Prompt for squares without people.
    #[arg(long)]
    fallback: Option<String>,

    /// Inpainting square side length (256, 512 or 1024).
    #[arg(long, default_value_t = 1024)]
    square: u32,

    /// Scroll step in pixels. Defaults to half the square.
    #[arg(long)]
    step: Option<u32>,

    /// Steer focus and prompts with face/subject boxes from the scene file.
    #[arg(long)]
    humans: bool,

    /// Scene sidecar JSON with prompts, captions and detection boxes.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Inpainting command; receives PNG on stdin, must print PNG to stdout.
    #[arg(long = "inpaint-cmd", conflicts_with = "fill")]
    inpaint_cmd: Option<String>,

    /// Fill squares with a solid RRGGBB or RRGGBBAA color instead of
    /// calling an inpainting command.
    #[arg(long)]
    fill: Option<String>,

    /// Caption command; receives PNG on stdin, must print a description.
    #[arg(long = "caption-cmd")]
    caption_cmd: Option<String>,

    /// Log at debug level and save a canvas snapshot after every square.
    #[arg(long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output canvas width in pixels.
    #[arg(long)]
    width: u32,

    /// Output canvas height in pixels.
    #[arg(long)]
    height: u32,

    /// Inpainting square side length (256, 512 or 1024).
    #[arg(long, default_value_t = 1024)]
    square: u32,

    /// Scroll step in pixels. Defaults to half the square.
    #[arg(long)]
    step: Option<u32>,

    /// Scene sidecar JSON; its first face box seeds the center of focus.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Write the JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct DescribeArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Caption command; receives PNG on stdin, must print a description.
    #[arg(long = "caption-cmd")]
    caption_cmd: Option<String>,

    /// Scene sidecar JSON with a pre-computed caption.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => {
            init_logging(args.verbose);
            cmd_run(args)
        }
        Command::Plan(args) => {
            init_logging(args.verbose);
            cmd_plan(args)
        }
        Command::Describe(args) => {
            init_logging(args.verbose);
            cmd_describe(args)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let input = outward::load_rgba(&args.in_path)?;
    let scene = load_scene(args.scene.as_deref())?;

    let mut params = outward::OutpaintParams::new(
        args.width,
        args.height,
        outward::SquareSize::from_pixels(args.square)?,
    )
    .with_humans(args.humans);
    if let Some(step) = args.step {
        params = params.with_step(step);
    }
    let prompt = args
        .prompt
        .or_else(|| scene.as_ref().and_then(|s| s.prompt.clone()));
    if let Some(prompt) = prompt {
        params = params.with_prompt(prompt);
    }
    if let Some(fallback) = args.fallback {
        params = params.with_fallback(fallback);
    }

    let inpainter: Box<dyn outward::Inpainter> = if let Some(fill) = &args.fill {
        Box::new(outward::FillInpainter::new(parse_rgba(fill)?))
    } else if let Some(spec) = &args.inpaint_cmd {
        Box::new(outward::CommandInpainter::from_spec(spec)?)
    } else {
        anyhow::bail!("pass --inpaint-cmd or --fill to choose an inpainting backend");
    };

    let mut collaborators = outward::Collaborators::new(inpainter);
    if let Some(scene) = &scene {
        collaborators = collaborators
            .with_faces(Box::new(scene.clone()))
            .with_subjects(Box::new(scene.clone()))
            .with_captioner(Box::new(scene.clone()));
    }
    if let Some(spec) = &args.caption_cmd {
        collaborators =
            collaborators.with_captioner(Box::new(outward::CommandCaptioner::from_spec(spec)?));
    }

    let out_path = args
        .out
        .unwrap_or_else(|| default_out_path(&args.in_path, args.width, args.height));

    let mut session = outward::OutpaintSession::new(input, params, collaborators)?;

    let mut sink: Box<dyn outward::SnapshotSink> = if args.verbose {
        Box::new(outward::FsSnapshots::for_output(&out_path))
    } else {
        Box::new(outward::NullSnapshots)
    };

    match session.run(sink.as_mut()) {
        Ok(stats) => {
            session.canvas().save_png(&out_path)?;
            eprintln!(
                "wrote {} ({} squares painted, {} skipped)",
                out_path.display(),
                stats.painted,
                stats.skipped
            );
            Ok(())
        }
        Err(err) => {
            let partial = partial_out_path(&out_path);
            match session.canvas().save_png(&partial) {
                Ok(()) => eprintln!("preserved partial canvas at {}", partial.display()),
                Err(save_err) => eprintln!("could not save partial canvas: {save_err}"),
            }
            Err(err.into())
        }
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let input = outward::load_rgba(&args.in_path)?;
    let (input_width, input_height) = input.dimensions();
    let scene = load_scene(args.scene.as_deref())?;

    let mut params = outward::OutpaintParams::new(
        args.width,
        args.height,
        outward::SquareSize::from_pixels(args.square)?,
    );
    if let Some(step) = args.step {
        params = params.with_step(step);
    }
    params.validate(input_width, input_height)?;

    let face = scene.as_ref().and_then(|s| s.face_box());
    let focus = outward::resolve_center_of_focus(face, input_width, input_height);
    let expansion =
        outward::calculate_expansion(focus, input_width, input_height, args.width, args.height)?;
    let square = params.square.pixels();
    let initial = outward::initial_square_position(expansion, square, input_width, input_height);
    let plan = outward::create_planned_squares(
        initial,
        square,
        params.step_pixels(),
        args.width,
        args.height,
    );

    let doc = serde_json::json!({
        "input": { "width": input_width, "height": input_height },
        "output": { "width": args.width, "height": args.height },
        "center_of_focus": { "x": focus.x, "y": focus.y },
        "expansion": expansion,
        "anchor_side": outward::anchor_side(expansion),
        "square": square,
        "step": params.step_pixels(),
        "squares": plan
            .iter()
            .map(|(key, sq)| {
                serde_json::json!({
                    "key": key.to_string(),
                    "x": sq.x,
                    "y": sq.y,
                    "size": sq.size,
                })
            })
            .collect::<Vec<_>>(),
    });
    let text = serde_json::to_string_pretty(&doc)?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, text + "\n")
                .with_context(|| format!("write plan '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_describe(args: DescribeArgs) -> anyhow::Result<()> {
    let input = outward::load_rgba(&args.in_path)?;
    let mut captioner: Box<dyn outward::Captioner> = if let Some(spec) = &args.caption_cmd {
        Box::new(outward::CommandCaptioner::from_spec(spec)?)
    } else if let Some(path) = &args.scene {
        Box::new(outward::SceneSidecar::load(path)?)
    } else {
        anyhow::bail!("pass --caption-cmd or --scene to choose a description source");
    };
    let description = captioner.describe(&input)?;
    println!("{description}");
    Ok(())
}

fn load_scene(path: Option<&Path>) -> anyhow::Result<Option<outward::SceneSidecar>> {
    match path {
        Some(path) => Ok(Some(outward::SceneSidecar::load(path)?)),
        None => Ok(None),
    }
}

/// `photo.png` outpainted to 1024x768 becomes `photo_outpainted-1024x768.png`
/// next to the input.
fn default_out_path(in_path: &Path, width: u32, height: u32) -> PathBuf {
    let stem = in_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "outpaint".to_string());
    in_path.with_file_name(format!("{stem}_outpainted-{width}x{height}.png"))
}

fn partial_out_path(out_path: &Path) -> PathBuf {
    let stem = out_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "outpaint".to_string());
    out_path.with_file_name(format!("{stem}-partial.png"))
}

/// Parses `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
fn parse_rgba(text: &str) -> anyhow::Result<[u8; 4]> {
    let hex = text.trim().trim_start_matches('#');
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        anyhow::bail!("fill color must be RRGGBB or RRGGBBAA hex, got '{text}'");
    }
    let byte = |i: usize| {
        u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|_| anyhow::anyhow!("fill color must be hex, got '{text}'"))
    };
    let alpha = if hex.len() == 8 { byte(3)? } else { 255 };
    Ok([byte(0)?, byte(1)?, byte(2)?, alpha])
}
