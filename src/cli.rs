// ============================================================================
// CutoutFE CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   cutoutfe --input photo.png --mask photo_mask.png --output cutout.png
//   cutoutfe -i photo.jpg --preset bw -o stylized.png
//   cutoutfe -i "shots/*.jpg" --mask-dir masks/ --output-dir processed/
//   cutoutfe -i photo.png --rotate 90 --flip --crop 40,40,400,300 -o out.png
//
// Each input runs through the same pipeline an interactive session would:
// load → segmentation (from a confidence-mask file) → background → preset or
// sliders → rotate/flip → crop bake → PNG export. All processing is
// synchronous on the current thread.
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::Rgba;

use crate::components::presets::Preset;
use crate::io::{export_png, load_image};
use crate::ops::segmentation::MaskFileProvider;
use crate::session::EditorSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// CutoutFE headless cut-out compositor.
///
/// Remove backgrounds with a confidence-mask file, restyle with presets or
/// sliders, transform, crop, and export PNGs — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "cutoutfe",
    about = "CutoutFE headless batch cut-out compositor",
    long_about = "Composite cut-out foregrounds over replacement backgrounds without\n\
                  opening the GUI. Background removal reads a per-pixel confidence\n\
                  mask image (white = foreground); the exported artifact is always\n\
                  a lossless PNG.\n\n\
                  Example:\n  \
                  cutoutfe --input photo.png --mask mask.png --preset moody -o out.png\n  \
                  cutoutfe -i \"*.jpg\" --mask-dir masks/ --output-dir cutouts/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Confidence mask image for background removal (grayscale, white =
    /// foreground). Resized to the input's dimensions when they differ.
    #[arg(long, value_name = "MASK.png")]
    pub mask: Option<PathBuf>,

    /// Directory of mask images for batch input: for each input file the
    /// mask is looked up as `<dir>/<stem>.png`.
    #[arg(long, value_name = "DIR")]
    pub mask_dir: Option<PathBuf>,

    /// Use the loose mask operating point (keeps more of the uncertain edge
    /// region) instead of the strict one.
    #[arg(long)]
    pub loose: bool,

    /// Apply a named preset: moody, cinematic, vintage, warm, cool, bw.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Brightness adjustment (-100..100). Ignored when --preset is given.
    #[arg(long, default_value_t = 0.0, value_name = "VAL")]
    pub brightness: f32,

    /// Contrast adjustment (-100..100). Ignored when --preset is given.
    #[arg(long, default_value_t = 0.0, value_name = "VAL")]
    pub contrast: f32,

    /// Saturation adjustment (-100..100). Ignored when --preset is given.
    #[arg(long, default_value_t = 0.0, value_name = "VAL")]
    pub saturation: f32,

    /// Replacement background color as #rrggbb hex.
    #[arg(long, value_name = "#RRGGBB")]
    pub background: Option<String>,

    /// Replacement background image file.
    #[arg(long, value_name = "FILE")]
    pub background_image: Option<PathBuf>,

    /// Rotate clockwise by 90, 180 or 270 degrees.
    #[arg(long, value_name = "DEG")]
    pub rotate: Option<u16>,

    /// Flip horizontally.
    #[arg(long)]
    pub flip: bool,

    /// Crop rectangle in surface coordinates: x,y,w,h (applied after
    /// rotate/flip, baking them into the output).
    #[arg(long, value_name = "X,Y,W,H")]
    pub crop: Option<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files are written here with
    /// the original stem and a .png extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    // Validate the flags that can fail before touching any file
    let preset = match &args.preset {
        Some(name) => match Preset::from_label(name) {
            Some(p) => Some(p),
            None => {
                eprintln!(
                    "error: unknown preset '{}'. Available: moody, cinematic, vintage, warm, cool, bw.",
                    name
                );
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    let background = match args.background.as_deref().map(parse_hex_color) {
        Some(Ok(color)) => Some(color),
        Some(Err(e)) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
        None => None,
    };
    let crop_rect = match args.crop.as_deref().map(parse_crop_rect) {
        Some(Ok(rect)) => Some(rect),
        Some(Err(e)) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
        None => None,
    };
    if let Some(deg) = args.rotate {
        if deg % 90 != 0 || deg == 0 || deg > 270 {
            eprintln!("error: --rotate accepts 90, 180 or 270.");
            return ExitCode::FAILURE;
        }
    }

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
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

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        let mask_path = mask_path_for(input_path, args.mask.as_deref(), args.mask_dir.as_deref());

        match run_one(
            input_path,
            &output_path,
            mask_path.as_deref(),
            args.loose,
            preset,
            (args.brightness, args.contrast, args.saturation),
            background,
            args.background_image.as_deref(),
            args.rotate,
            args.flip,
            crop_rect,
        ) {
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
// Per-file processing pipeline
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn run_one(
    input: &Path,
    output: &Path,
    mask: Option<&Path>,
    loose: bool,
    preset: Option<Preset>,
    sliders: (f32, f32, f32),
    background: Option<Rgba<u8>>,
    background_image: Option<&Path>,
    rotate: Option<u16>,
    flip: bool,
    crop_rect: Option<(f32, f32, f32, f32)>,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let mut session = EditorSession::new();
    session.load_image(load_image(input)?);

    // -- Step 2: Background removal (optional) ---------------------------
    if let Some(mask_path) = mask {
        if loose {
            session.toggle_mask_strictness();
        }
        let mut provider = MaskFileProvider::new(mask_path);
        session
            .remove_background(&mut provider)
            .map_err(|e| e.to_string())?;
    }

    // -- Step 3: Background layer (optional) -----------------------------
    if let Some(path) = background_image {
        session.set_background_image(load_image(path)?);
    } else if let Some(color) = background {
        session.set_background_color(color);
    }

    // -- Step 4: Adjustments ---------------------------------------------
    if let Some(preset) = preset {
        session.apply_preset(preset);
    } else {
        session.adjustments.brightness = sliders.0;
        session.adjustments.contrast = sliders.1;
        session.adjustments.saturation = sliders.2;
    }

    // -- Step 5: Transform + crop bake -----------------------------------
    if let Some(deg) = rotate {
        for _ in 0..deg / 90 {
            session.rotate_cw();
        }
    }
    if flip {
        session.toggle_flip();
    }
    if let Some((x, y, w, h)) = crop_rect {
        if !session.crop(x, y, w, h) {
            return Err(format!(
                "crop rectangle {},{},{}x{} is degenerate or outside the image",
                x, y, w, h
            ));
        }
    }

    // -- Step 6: Export --------------------------------------------------
    export_png(&session, output)
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
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
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

/// The mask file for one input: an explicit `--mask` wins; otherwise look up
/// `<mask_dir>/<stem>.png`.
fn mask_path_for(
    input: &Path,
    mask: Option<&Path>,
    mask_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(m) = mask {
        return Some(m.to_path_buf());
    }
    let dir = mask_dir?;
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    Some(dir.join(format!("{}.png", stem)))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, `.png` extension
///    (appends `_out` to the stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.png", stem));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.png", stem)))
    } else {
        Some(candidate)
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into an opaque RGBA color.
fn parse_hex_color(s: &str) -> Result<Rgba<u8>, String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid color '{}': expected #rrggbb", s));
    }
    let r = u8::from_str_radix(&hex[0..2], 16).map_err(|e| e.to_string())?;
    let g = u8::from_str_radix(&hex[2..4], 16).map_err(|e| e.to_string())?;
    let b = u8::from_str_radix(&hex[4..6], 16).map_err(|e| e.to_string())?;
    Ok(Rgba([r, g, b, 255]))
}

/// Parse `x,y,w,h` into a crop rectangle.
fn parse_crop_rect(s: &str) -> Result<(f32, f32, f32, f32), String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid crop '{}': expected x,y,w,h", s))?;
    if parts.len() != 4 {
        return Err(format!("invalid crop '{}': expected 4 values, got {}", s, parts.len()));
    }
    Ok((parts[0], parts[1], parts[2], parts[3]))
}

// ============================================================================
// Tests
// ============================================================================
