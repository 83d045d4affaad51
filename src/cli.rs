// ============================================================================
// maskpaint CLI — headless stroke-trace replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   maskpaint --input photo.png --trace strokes.json --output mask.png
//   maskpaint -i "shots/*.png" --trace strokes.json --output-dir masks/
//
// No GUI is opened in CLI mode.  The trace is replayed through the exact same
// stroke/fill/stamp engine the GUI uses, and the resulting binary mask is
// written as PNG.  An input whose replay ends with an empty mask produces no
// output file and is reported as a failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::canvas::MaskCanvas;
use crate::io::{load_source_image, write_mask_png};
use crate::ops::stamp::Placement;
use crate::ops::stroke::BrushMode;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// maskpaint headless mask renderer.
///
/// Replay a recorded stroke trace over source images and write the binary
/// selection masks — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "maskpaint",
    about = "maskpaint headless mask renderer",
    long_about = "Replay a JSON stroke trace (paint/erase strokes, object stamps,\n\
                  clears) over source images and write the resulting binary\n\
                  black/white masks as PNG, without opening the GUI.\n\n\
                  Example:\n  \
                  maskpaint --input photo.png --trace strokes.json --output mask.png\n  \
                  maskpaint -i \"shots/*.png\" --trace strokes.json --output-dir masks/"
)]
pub struct CliArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// JSON stroke-trace file to replay on each input image.
    #[arg(short, long, value_name = "TRACE.json")]
    pub trace: PathBuf,

    /// Output mask path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.  Masks are written here as
    /// `<stem>_mask.png`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print per-file timing and replay information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// `true` when any CLI-mode flag is present in the real process
    /// arguments.  Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

// ============================================================================
// Trace format (serde)
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceBrush {
    Paint,
    Erase,
}

impl From<TraceBrush> for BrushMode {
    fn from(b: TraceBrush) -> Self {
        match b {
            TraceBrush::Paint => BrushMode::Paint,
            TraceBrush::Erase => BrushMode::Erase,
        }
    }
}

/// One recorded editing action.  Coordinates are image-space pixels; replay
/// runs with an identity viewport so screen space and image space coincide.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TraceAction {
    Stroke {
        mode: TraceBrush,
        brush_size: f32,
        opacity: f32,
        points: Vec<[f32; 2]>,
    },
    Stamp {
        source: PathBuf,
        #[serde(flatten)]
        placement: Placement,
        opacity: f32,
    },
    Clear,
}

/// Load and parse a trace file.
pub fn load_trace(path: &Path) -> Result<Vec<TraceAction>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read trace '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid trace '{}': {}", path.display(), e))
}

/// Replay a trace onto a canvas through the same engine the GUI drives.
pub fn replay(canvas: &mut MaskCanvas, actions: &[TraceAction]) -> Result<(), String> {
    for action in actions {
        match action {
            TraceAction::Stroke { mode, brush_size, opacity, points } => {
                canvas.brush.mode = (*mode).into();
                canvas.set_brush_size(*brush_size);
                canvas.set_mask_opacity(*opacity);
                let mut iter = points.iter();
                if let Some(first) = iter.next() {
                    canvas.begin_stroke((first[0], first[1]));
                    for pt in iter {
                        canvas.extend_stroke((pt[0], pt[1]));
                    }
                    canvas.end_stroke();
                }
            }
            TraceAction::Stamp { source, placement, opacity } => {
                let bitmap = load_source_image(source)
                    .map_err(|e| format!("stamp source '{}': {}", source.display(), e))?;
                canvas.set_mask_opacity(*opacity);
                canvas.stamp(&bitmap, placement);
            }
            TraceAction::Clear => canvas.clear_mask(),
        }
    }
    Ok(())
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = every input produced a mask, `1` = one or more inputs failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let actions = match load_trace(&args.trace) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let output_path = match build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref()) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, &actions, args.verbose) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, actions: &[TraceAction], verbose: bool) -> Result<(), String> {
    let base = load_source_image(input).map_err(|e| format!("load failed: {}", e))?;
    let (w, h) = base.dimensions();
    let mut canvas = MaskCanvas::new(base);

    replay(&mut canvas, actions)?;
    if verbose {
        println!("  replayed {} action(s) on {}×{} image", actions.len(), w, h);
    }

    let binary = canvas
        .extract_binary_mask()
        .ok_or_else(|| "trace produced an empty mask; nothing written".to_string())?;

    write_mask_png(&binary, output).map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for one input file: explicit `--output`, the batch
/// directory, or `<stem>_mask.png` next to the input.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}_mask.png", stem)));
    }
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_mask.png", stem)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn trace_json_round_trip() {
        let json = r#"[
            {"action": "stroke", "mode": "paint", "brush_size": 12.0, "opacity": 0.6,
             "points": [[10.0, 10.0], [50.0, 10.0], [50.0, 50.0], [12.0, 12.0]]},
            {"action": "clear"},
            {"action": "stamp", "source": "obj.png", "opacity": 0.5,
             "x": 5.0, "y": 5.0, "width": 20.0, "height": 20.0, "rotation_degrees": 30.0}
        ]"#;
        let actions: Vec<TraceAction> = serde_json::from_str(json).unwrap();
        assert_eq!(actions.len(), 3);
        match &actions[0] {
            TraceAction::Stroke { mode, points, .. } => {
                assert_eq!(*mode, TraceBrush::Paint);
                assert_eq!(points.len(), 4);
            }
            other => panic!("expected stroke, got {:?}", other),
        }
        match &actions[2] {
            TraceAction::Stamp { placement, .. } => {
                assert_eq!(placement.rotation_degrees, 30.0);
            }
            other => panic!("expected stamp, got {:?}", other),
        }
    }

    #[test]
    fn replay_paints_then_clears() {
        let mut canvas = MaskCanvas::new(RgbaImage::new(100, 100));
        let actions: Vec<TraceAction> = serde_json::from_str(
            r#"[
                {"action": "stroke", "mode": "paint", "brush_size": 10.0, "opacity": 0.6,
                 "points": [[20.0, 20.0], [80.0, 20.0]]},
                {"action": "clear"}
            ]"#,
        )
        .unwrap();
        replay(&mut canvas, &actions).unwrap();
        assert!(!canvas.has_selection());
    }

    #[test]
    fn output_path_falls_back_to_stem_mask() {
        let p = build_output_path(Path::new("/tmp/photo.jpg"), None, None).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/photo_mask.png"));
        let q = build_output_path(Path::new("photo.jpg"), None, Some(Path::new("out"))).unwrap();
        assert_eq!(q, PathBuf::from("out/photo_mask.png"));
    }
}
