use clap::Parser;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use nucleiband::models::split_channels;
use nucleiband::report::render_overlay;
use nucleiband::{
    Channel, ChannelSet, LabelImageSegmenter, Pipeline, Segmenter, ThresholdConfig,
    ThresholdSegmenter,
};

#[derive(Parser)]
#[command(name = "nucleiband")]
#[command(about = "Count positive cells from nucleus and peri-nuclear band intensities")]
struct Cli {
    /// Composite multi-channel image (split into C1, C2, C3)
    #[arg(value_name = "IMAGE", required_unless_present_all = ["nuclei", "first", "second"])]
    image_path: Option<PathBuf>,

    /// Separate nucleus channel image
    #[arg(long, value_name = "FILE", requires_all = ["first", "second"], conflicts_with = "image_path")]
    nuclei: Option<PathBuf>,

    /// Separate image of the channel measured inside nuclei
    #[arg(long, value_name = "FILE", requires_all = ["nuclei", "second"], conflicts_with = "image_path")]
    first: Option<PathBuf>,

    /// Separate image of the channel measured in the band
    #[arg(long, value_name = "FILE", requires_all = ["nuclei", "first"], conflicts_with = "image_path")]
    second: Option<PathBuf>,

    /// Composite channel holding the nuclei (1-based)
    #[arg(long, default_value_t = 1)]
    nuclei_channel: usize,

    /// Composite channel measured inside nuclei (1-based)
    #[arg(long, default_value_t = 3)]
    first_channel: usize,

    /// Composite channel measured in the band (1-based)
    #[arg(long, default_value_t = 2)]
    second_channel: usize,

    /// Display name of the first channel
    #[arg(long, default_value = "MR")]
    first_name: String,

    /// Display name of the second channel
    #[arg(long, default_value = "NCC")]
    second_name: String,

    /// JSON file with threshold parameters (flags override it)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Thickness of the band around the nuclei in pixels
    #[arg(long)]
    band_thickness: Option<u8>,

    /// Intensity threshold for the first channel
    #[arg(long)]
    first_threshold: Option<f64>,

    /// Intensity threshold for the second channel
    #[arg(long)]
    second_threshold: Option<f64>,

    /// Minimum nucleus area in pixels²
    #[arg(long)]
    min_area: Option<f64>,

    /// Label image from an external nucleus segmentation
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Fixed nucleus intensity level for threshold segmentation (Otsu if unset)
    #[arg(long)]
    nuclei_level: Option<u16>,

    /// Exclude nuclei within this many pixels of the border
    #[arg(long, default_value_t = 2)]
    exclude_boundary: u32,

    /// Segmentation timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Write the full run report as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Write an annotated PNG of the nucleus channel
    #[arg(long, value_name = "FILE")]
    overlay: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_image(path: &Path) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))
}

fn pick(channels: &[Channel], index: usize, name: &str) -> anyhow::Result<Channel> {
    let channel = index
        .checked_sub(1)
        .and_then(|i| channels.get(i))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "channel {} out of range, image has {} channel(s)",
                index,
                channels.len()
            )
        })?;
    Ok(Channel::new(name, channel.image().clone()))
}

fn load_channels(args: &Cli) -> anyhow::Result<ChannelSet> {
    if let (Some(nuclei), Some(first), Some(second)) = (&args.nuclei, &args.first, &args.second) {
        return Ok(ChannelSet {
            nuclei: Channel::from_dynamic("Nuclei", &load_image(nuclei)?),
            first: Channel::from_dynamic(args.first_name.as_str(), &load_image(first)?),
            second: Channel::from_dynamic(args.second_name.as_str(), &load_image(second)?),
        });
    }

    let path = args
        .image_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no input image given"))?;
    let channels = split_channels(&load_image(path)?);
    Ok(ChannelSet {
        nuclei: pick(&channels, args.nuclei_channel, "Nuclei")?,
        first: pick(&channels, args.first_channel, &args.first_name)?,
        second: pick(&channels, args.second_channel, &args.second_name)?,
    })
}

fn build_config(args: &Cli) -> anyhow::Result<ThresholdConfig> {
    let mut config = match &args.config {
        Some(path) => ThresholdConfig::from_json_file(path)?,
        None => ThresholdConfig::default(),
    };
    if let Some(v) = args.band_thickness {
        config.band_thickness = v;
    }
    if let Some(v) = args.first_threshold {
        config.first_threshold = v;
    }
    if let Some(v) = args.second_threshold {
        config.second_threshold = v;
    }
    if let Some(v) = args.min_area {
        config.min_area = v;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = build_config(&args)?;
    let channels = load_channels(&args)?;
    tracing::debug!(
        width = channels.nuclei.dimensions().0,
        height = channels.nuclei.dimensions().1,
        "channels loaded"
    );

    let segmenter: Arc<dyn Segmenter> = match &args.labels {
        Some(path) => Arc::new(LabelImageSegmenter::from_image(&load_image(path)?)),
        None => Arc::new(ThresholdSegmenter {
            level: args.nuclei_level,
            exclude_boundary: args.exclude_boundary,
        }),
    };

    let mut pipeline =
        Pipeline::new(config).with_timeout(Duration::from_secs(args.timeout_secs));
    let report = pipeline.run(&channels, segmenter).await?;

    println!("\n=== Classification Results ===");
    for line in &report.log {
        println!("{}", line);
    }

    if args.verbose {
        println!("\nPositive cells:");
        for request in &report.annotations {
            println!("  region {} - {:?}", request.region_id, request.class);
        }
    }

    if let Some(path) = &args.json {
        std::fs::write(path, report.to_json()?)?;
    }

    if let Some(path) = &args.overlay {
        let overlay = render_overlay(pipeline.store(), &report.annotations, &channels.nuclei)?;
        overlay
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to save overlay: {}", e))?;
    }

    Ok(())
}
