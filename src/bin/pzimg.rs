/// pzimg – CLI for the pzimg image codec.
///
///   pzimg compress photo.png            → photo.kmp (binary v2 container)
///   pzimg compress -a huffman --gray a.png -o a.kmp
///   pzimg compress --format json a.png  → a.json
///   pzimg decompress a.kmp              → a.png
///   pzimg decompress a.kmp -o a.jpg     → JPEG rendering (output only)
///   pzimg info *.kmp                    → generation, size, algorithm
///   pzimg stats photo.png               → statistics record as JSON
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::ColorType;
use log::LevelFilter;

use pzimg::container::{self, write_file_verified};
use pzimg::pipeline::{self, ColorMode, CompressOptions};
use pzimg::{decode_image, Algorithm, OutputFormat, PixelLayout};

#[derive(Parser, Debug)]
#[command(name = "pzimg", version, about = "pzimg - lossless image compression")]
struct Cli {
    /// Per-file summaries; -vv for debug, -vvv for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress an image file into a container
    Compress(CompressArgs),
    /// Decode a container of any generation back into an image file
    Decompress {
        input: PathBuf,
        /// Output image; the extension picks the encoder (default: .png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List container headers without decompressing
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print compression statistics for an image as JSON
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    input: PathBuf,

    /// Output container (default: input with .kmp, .json or .zip)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    codec: CodecArgs,

    /// Container: binary, json, zip
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Also write the statistics record to this file
    #[arg(long)]
    stats: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StatsArgs {
    input: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,
}

/// Flags shared by `compress` and `stats`.
#[derive(Args, Debug)]
struct CodecArgs {
    /// JSON file with CompressOptions; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Payload codec: none, zlib, huffman
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Reduce color images to grayscale
    #[arg(long)]
    gray: bool,

    /// Downsample images above this many pixels
    #[arg(long)]
    max_pixels: Option<u64>,
}

impl CodecArgs {
    fn options(&self) -> Result<CompressOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => CompressOptions::default(),
        };
        if let Some(algorithm) = self.algorithm {
            options.algorithm = algorithm;
        }
        if self.gray {
            options.color = ColorMode::Gray;
        }
        if self.max_pixels.is_some() {
            options.max_pixels = self.max_pixels;
        }
        Ok(options)
    }
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose, quiet))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Load any image the `image` crate understands as RGB8.
fn load_rgb(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let img = image::open(path).with_context(|| format!("decode image {}", path.display()))?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    Ok((rgb.into_raw(), w, h))
}

fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    let ext = match format {
        OutputFormat::Binary => "kmp",
        OutputFormat::Json => "json",
        OutputFormat::Zip => "zip",
    };
    input.with_extension(ext)
}

fn cmd_compress(args: &CompressArgs) -> Result<()> {
    let mut options = args.codec.options()?;
    if let Some(format) = args.format {
        options.format = format;
    }
    let (pixels, w, h) = load_rgb(&args.input)?;
    let compressed = pipeline::compress(&pixels, w, h, &options)
        .with_context(|| format!("compress {}", args.input.display()))?;
    let blob = compressed.to_container(options.format)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, options.format));
    if output == args.input {
        bail!("refusing to overwrite input {}", output.display());
    }
    write_file_verified(&output, &blob).with_context(|| format!("write {}", output.display()))?;

    if let Some(path) = &args.stats {
        let json = serde_json::to_string_pretty(&compressed.stats)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    }
    log::info!(
        "{}: {} -> {} bytes ({:.1}%), {}",
        args.input.display(),
        pixels.len(),
        blob.len(),
        blob.len() as f64 * 100.0 / pixels.len() as f64,
        output.display()
    );
    Ok(())
}

fn cmd_decompress(input: &Path, output: Option<&Path>) -> Result<()> {
    let blob = fs::read(input).with_context(|| format!("read {}", input.display()))?;
    let image = decode_image(&blob).with_context(|| format!("decode {}", input.display()))?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("png"));
    let color = match image.layout {
        PixelLayout::Gray => ColorType::L8,
        PixelLayout::Rgb => ColorType::Rgb8,
    };
    image::save_buffer(&output, &image.pixels, image.width, image.height, color)
        .with_context(|| format!("write {}", output.display()))?;
    log::info!(
        "{}: {}x{} {} -> {}",
        input.display(),
        image.width,
        image.height,
        image.layout,
        output.display()
    );
    Ok(())
}

fn cmd_info(files: &[PathBuf]) -> Result<()> {
    println!(
        "{:>12} {:>12} {:>11} {:>8} {:>9}  name",
        "container", "payload", "size", "algo", "format"
    );
    for path in files {
        let blob = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        match container::inspect(&blob) {
            Ok(info) => {
                let meta = info.metadata;
                let layout = meta.layout.map_or("?", PixelLayout::name);
                println!(
                    "{:>12} {:>12} {:>11} {:>8} {:>9}  {}",
                    info.container_size,
                    info.payload_size,
                    format!("{}x{} {layout}", meta.width, meta.height),
                    meta.algorithm.name(),
                    info.generation.name(),
                    path.display()
                );
            }
            Err(e) => eprintln!("pzimg: {}: {e}", path.display()),
        }
    }
    Ok(())
}

fn cmd_stats(args: &StatsArgs) -> Result<()> {
    let options = args.codec.options()?;
    let (pixels, w, h) = load_rgb(&args.input)?;
    let compressed = pipeline::compress(&pixels, w, h, &options)
        .with_context(|| format!("compress {}", args.input.display()))?;
    println!("{}", serde_json::to_string_pretty(&compressed.stats)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Compress(args) => cmd_compress(args),
        Command::Decompress { input, output } => cmd_decompress(input, output.as_deref()),
        Command::Info { files } => cmd_info(files),
        Command::Stats(args) => cmd_stats(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(log_level(0, false), LevelFilter::Warn);
        assert_eq!(log_level(1, false), LevelFilter::Info);
        assert_eq!(log_level(2, false), LevelFilter::Debug);
        assert_eq!(log_level(5, false), LevelFilter::Trace);
        assert_eq!(log_level(2, true), LevelFilter::Error);
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::try_parse_from(["pzimg", "-v", "info", "a.kmp"]).unwrap();
        assert_eq!(cli.verbose, 1);
        let cli = Cli::try_parse_from(["pzimg", "info", "-vv", "a.kmp"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_stats_takes_codec_flags_only() {
        let cli =
            Cli::try_parse_from(["pzimg", "stats", "a.png", "-a", "huffman", "--gray"]).unwrap();
        match cli.command {
            Command::Stats(args) => {
                let options = args.codec.options().unwrap();
                assert_eq!(options.algorithm, Algorithm::Huffman);
                assert_eq!(options.color, ColorMode::Gray);
            }
            other => panic!("parsed as {other:?}"),
        }
        assert!(Cli::try_parse_from(["pzimg", "stats", "a.png", "-o", "out.kmp"]).is_err());
        assert!(Cli::try_parse_from(["pzimg", "stats", "a.png", "--stats", "s.json"]).is_err());
        assert!(Cli::try_parse_from(["pzimg", "stats", "a.png", "--format", "zip"]).is_err());
    }

    #[test]
    fn test_compress_flags() {
        let cli = Cli::try_parse_from([
            "pzimg", "compress", "a.png", "-o", "a.kmp", "--format", "json", "--max-pixels", "100",
        ])
        .unwrap();
        match cli.command {
            Command::Compress(args) => {
                assert_eq!(args.format, Some(OutputFormat::Json));
                assert_eq!(args.codec.options().unwrap().max_pixels, Some(100));
                assert_eq!(args.output, Some(PathBuf::from("a.kmp")));
            }
            other => panic!("parsed as {other:?}"),
        }
    }
}
