use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    time::Duration,
};

use anyhow::Context as _;
use clap::Parser;

use flapboard::{
    driver::HISTORY_BLOCKS, BoardConfig, BoardController, EtherscanSource, HashSource, MaskImage,
    PseudoHashSource, Refresher,
};

#[derive(Parser, Debug)]
#[command(name = "flapboard", version)]
struct Cli {
    /// Viewport width in CSS pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in CSS pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Number of frames to render.
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Frames per second of the synthetic clock.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Device pixel ratio (capped by the configured maximum).
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,

    /// Output PNG path; with --frames > 1 the index is appended.
    #[arg(long)]
    out: PathBuf,

    /// Board configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raster image whose opaque pixels replace the procedural silhouette.
    #[arg(long)]
    mask_image: Option<PathBuf>,

    /// Fetch real transaction hashes from Etherscan instead of fabricating
    /// them (reads ETHERSCAN_API_KEY).
    #[arg(long)]
    live: bool,

    /// Seed for the offline pseudo-hash source.
    #[arg(long, default_value_t = 924_137)]
    seed: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => read_config_json(path)?,
        None => BoardConfig::default(),
    };

    let mut controller = BoardController::new(config)?;

    if let Some(path) = &cli.mask_image {
        // A broken mask is not fatal: the procedural silhouette stands in.
        match MaskImage::from_path(path) {
            Ok(image) => controller.set_mask_image(image, 0.0),
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "mask image unavailable, using procedural silhouette");
            }
        }
    }
    controller.resize_now(cli.width, cli.height, 0.0);

    let frame_ms = 1_000.0 / cli.fps.max(1.0);
    let refresh = Duration::from_millis(controller.board().config().refresh_interval_ms);

    if cli.live {
        let source = EtherscanSource::from_env()?;
        let refresher = Refresher::spawn(Box::new(source), refresh);
        let (seq, result) = refresher
            .recv_timeout(Duration::from_secs(30))
            .context("no response from hash source")?;
        controller.apply_fetch(seq, result, 0.0);
        render_frames(&mut controller, &cli, frame_ms, Some(&refresher))?;
    } else {
        let mut source = PseudoHashSource::new(cli.seed, 24);
        controller.apply_fetch(1, source.fetch_latest(HISTORY_BLOCKS), 0.0);
        render_frames(&mut controller, &cli, frame_ms, None)?;
    }

    Ok(())
}

fn read_config_json(path: &std::path::Path) -> anyhow::Result<BoardConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let config: BoardConfig = serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    Ok(config)
}

fn render_frames(
    controller: &mut BoardController,
    cli: &Cli,
    frame_ms: f64,
    refresher: Option<&Refresher>,
) -> anyhow::Result<()> {
    for i in 0..cli.frames {
        let now = i as f64 * frame_ms;
        if let Some(refresher) = refresher {
            for (seq, result) in refresher.poll() {
                controller.apply_fetch(seq, result, now);
            }
        }
        controller.tick(now);

        let frame = flapboard::render_frame(controller.board(), now, cli.dpr)?;
        let out = frame_path(&cli.out, i, cli.frames);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            &out,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
    }
    eprintln!("wrote {} frame(s) to {}", cli.frames, cli.out.display());
    Ok(())
}

fn frame_path(out: &std::path::Path, index: u64, total: u64) -> PathBuf {
    if total <= 1 {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    let ext = out.extension().and_then(|s| s.to_str()).unwrap_or("png");
    out.with_file_name(format!("{stem}_{index:05}.{ext}"))
}
