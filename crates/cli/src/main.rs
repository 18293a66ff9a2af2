use std::path::PathBuf;
use std::process;

use clap::Parser;

use bag2video_core::pipeline::batch_convert_use_case::BatchConvertUseCase;
use bag2video_core::pipeline::convert_config::ConvertConfig;
use bag2video_core::pipeline::decode_video_use_case::DecodeVideoUseCase;
use bag2video_core::pipeline::pipeline_logger::LogPipelineLogger;
use bag2video_core::shared::constants::DEFAULT_PREVIEW_EVERY;
use bag2video_core::video::infrastructure::writer_factory::FfmpegWriterFactory;

/// Convert the image topics of rosbag2 recordings into mp4 videos.
#[derive(Parser)]
#[command(name = "bag2video")]
struct Cli {
    /// Root folder of bags, a bag directory, or its metadata.yaml.
    #[arg(long = "bag_name")]
    bag_name: PathBuf,

    /// Frames per second of the output videos [default: 30].
    #[arg(long)]
    fps: Option<f64>,

    /// Output directory. Default is the bag directory itself.
    #[arg(long = "out_dir")]
    out_dir: Option<PathBuf>,

    /// Skip topics whose video already exists.
    #[arg(long = "skip_exist")]
    skip_exist: bool,

    /// JSON file with base settings; flags given here override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ffmpeg executable to run.
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Feed the encoder on the reading thread instead of a background one.
    #[arg(long = "no_thread")]
    no_thread: bool,

    /// Save periodic PNG snapshots of every video to this directory.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Frames buffered per video before reading blocks.
    #[arg(long = "channel_capacity")]
    channel_capacity: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    log::debug!("Effective config: {config:?}");

    let mut factory = FfmpegWriterFactory::new(config.codec_preference.clone(), config.writer_options());
    if let Some(dir) = &config.preview_dir {
        factory = factory.with_preview(dir.clone(), DEFAULT_PREVIEW_EVERY);
    }

    let decoder = DecodeVideoUseCase::new(
        Box::new(factory),
        Box::new(LogPipelineLogger::new(config.progress_every)),
        config.fps,
        config.out_dir.clone(),
        config.skip_exist,
    );
    let report = BatchConvertUseCase::with_sqlite(decoder).execute(&cli.bag_name);

    for (bag, reason) in &report.failures {
        log::warn!("{}: {reason}", bag.display());
    }
    Ok(())
}

/// Config file (or defaults) with explicit flags applied on top.
fn build_config(cli: &Cli) -> Result<ConvertConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };

    if let Some(fps) = cli.fps {
        config.fps = fps;
    }
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = Some(out_dir.clone());
    }
    if cli.skip_exist {
        config.skip_exist = true;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.ffmpeg_binary = ffmpeg.clone();
    }
    if cli.no_thread {
        config.threaded = false;
    }
    if let Some(preview) = &cli.preview {
        config.preview_dir = Some(preview.clone());
    }
    if let Some(capacity) = cli.channel_capacity {
        config.channel_capacity = capacity;
    }

    config.validate()?;
    Ok(config)
}
