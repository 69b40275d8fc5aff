use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use paperscan::{imread, imwrite, CornerPoints, Point2f, ScanConfig, ScanError, Scanner};

#[derive(Parser)]
#[command(name = "paperscan")]
#[command(about = "Pure Rust document scanner - paper detection and perspective rectification", long_about = None)]
struct Cli {
    /// Input image path
    image: PathBuf,

    /// Reference-frame padding in pixels for the framing check
    #[arg(long, default_value_t = paperscan::DEFAULT_PADDING)]
    padding: f32,

    /// Outward corner margin in pixels applied before rectification
    #[arg(long, default_value_t = paperscan::DEFAULT_CORNER_MARGIN)]
    corner_margin: f32,

    /// Write the rectified document to this path (PNG)
    #[arg(short = 'o', long)]
    extract: Option<PathBuf>,

    /// Rectified output width (defaults to the frame width)
    #[arg(long)]
    width: Option<u32>,

    /// Rectified output height (defaults to the frame height)
    #[arg(long)]
    height: Option<u32>,

    /// Manual corner override as "x,y x,y x,y x,y" (top-left top-right
    /// bottom-left bottom-right), replacing automatic detection
    #[arg(long)]
    corners: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// JSON with corners, area and framing verdict
    Json,
    /// Plain text, one line per corner
    Text,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let scanner = Scanner::with_config(ScanConfig {
        padding: cli.padding,
        corner_margin: cli.corner_margin,
    });

    let img = imread(&cli.image)?;

    let detection = match scanner.detect(&img) {
        Ok(d) => Some(d),
        Err(ScanError::NoPaperDetected) => None,
        Err(e) => return Err(e.into()),
    };

    match cli.format {
        OutputFormat::Json => {
            let json_output = match &detection {
                Some(d) => serde_json::json!({
                    "detected": true,
                    "corners": d.corners,
                    "area": d.area,
                    "better_framing": d.better_framing,
                }),
                None => serde_json::json!({ "detected": false }),
            };
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        }
        OutputFormat::Text => match &detection {
            Some(d) => {
                print_corner("top-left", d.corners.top_left);
                print_corner("top-right", d.corners.top_right);
                print_corner("bottom-left", d.corners.bottom_left);
                print_corner("bottom-right", d.corners.bottom_right);
                println!("area\t{:.0}", d.area);
                println!("better-framing\t{}", d.better_framing);
            }
            None => println!("no paper detected"),
        },
    }

    if let Some(out_path) = cli.extract {
        let corners = match cli.corners.as_deref() {
            Some(spec) => Some(parse_corners(spec)?),
            None => detection.as_ref().map(|d| d.corners),
        };
        let corners = corners.ok_or(ScanError::NoPaperDetected)?;

        let width = cli.width.unwrap_or(img.cols() as u32);
        let height = cli.height.unwrap_or(img.rows() as u32);
        let paper = scanner.extract_paper(&img, Some(&corners), width, height)?;
        imwrite(&out_path, &paper)?;
        eprintln!("wrote {}x{} rectified document to {}", width, height, out_path.display());
    }

    Ok(())
}

fn print_corner(label: &str, corner: Option<Point2f>) {
    match corner {
        Some(p) => println!("{}\t{:.1},{:.1}", label, p.x, p.y),
        None => println!("{}\t-", label),
    }
}

/// Parses "x,y x,y x,y x,y" in top-left, top-right, bottom-left,
/// bottom-right order.
fn parse_corners(spec: &str) -> Result<CornerPoints, String> {
    let mut pts = Vec::new();
    for part in spec.split_whitespace() {
        let (x, y) = part
            .split_once(',')
            .ok_or_else(|| format!("bad corner '{}', expected x,y", part))?;
        let x: f32 = x.trim().parse().map_err(|_| format!("bad x in '{}'", part))?;
        let y: f32 = y.trim().parse().map_err(|_| format!("bad y in '{}'", part))?;
        pts.push(Point2f::new(x, y));
    }
    if pts.len() != 4 {
        return Err(format!("expected 4 corners, got {}", pts.len()));
    }
    Ok(CornerPoints {
        top_left: Some(pts[0]),
        top_right: Some(pts[1]),
        bottom_left: Some(pts[2]),
        bottom_right: Some(pts[3]),
    })
}
