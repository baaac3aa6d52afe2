//! Application runner - command implementations behind the CLI binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{debug, info, trace, warn};

use crate::cli::{Args, Command, RenderArgs, SimulateArgs};
use crate::config::{self, AnimatorSettings};
use crate::core::driver::{Driver, DriverEvent, DriverState, FrameSource};
use crate::core::host::{RecordingInputLock, SimulatedViewport};
use crate::core::preload::{PreloadEvent, preload_catalog};
use crate::core::workers::Workers;
use crate::entities::compositor::{Compositor, PixelCanvas};
use crate::entities::frame::FrameAsset;
use crate::entities::loader::{AssetLoader, FsLoader, PlaceholderLoader, parse_hex_color};
use crate::entities::mapper::map_frame;
use crate::entities::product::{Catalog, ProductConfig};
use crate::entities::resolver::resolve;

/// Simulated animation-frame interval (~60 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Run one CLI command with parsed arguments.
///
/// Logging must already be initialised by the caller. `resolve` and `frame`
/// are pure and never create directories; the other commands do.
pub fn run_app(args: Args) -> Result<()> {
    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    match args.command {
        Command::Resolve { base, frame } => {
            println!("{}", resolve(&base, frame));
            Ok(())
        }
        Command::Frame { progress, direction, frames } => {
            let total = match frames {
                Some(n) => n,
                None => load_settings(&path_config, args.workers)?.default_frame_count,
            };
            println!("{}", map_frame(progress, direction, total));
            Ok(())
        }
        Command::Render(render) => {
            prepare_dirs(&path_config);
            let settings = load_settings(&path_config, args.workers)?;
            let catalog = load_catalog(args.catalog.as_deref())?;
            cmd_render(&catalog, &settings, render)
        }
        Command::Simulate(simulate) => {
            prepare_dirs(&path_config);
            let settings = load_settings(&path_config, args.workers)?;
            let catalog = load_catalog(args.catalog.as_deref())?;
            cmd_simulate(&catalog, &settings, simulate)
        }
        Command::Preload { assets } => {
            prepare_dirs(&path_config);
            let settings = load_settings(&path_config, args.workers)?;
            let catalog = load_catalog(args.catalog.as_deref())?;
            cmd_preload(&catalog, &settings, assets)
        }
    }
}

fn prepare_dirs(path_config: &config::PathConfig) {
    // Ensure directories exist
    if let Err(e) = config::ensure_dirs(path_config) {
        warn!("Failed to create application directories: {}", e);
    }
}

/// Settings from the config directory (defaults if absent), `--workers` applied.
fn load_settings(path_config: &config::PathConfig, workers: Option<usize>) -> Result<AnimatorSettings> {
    let settings_path = config::config_file(config::SETTINGS_FILE, path_config);
    info!("Config path: {}", settings_path.display());

    let mut settings = AnimatorSettings::load(&settings_path)?;
    if workers.is_some() {
        settings.workers = workers;
    }
    trace!("Settings: {:?}", settings);
    Ok(settings)
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog: {}", path.display())),
        None => Ok(Catalog::builtin()),
    }
}

fn pick_product<'a>(catalog: &'a Catalog, id: Option<&str>) -> Result<&'a ProductConfig> {
    match id {
        Some(id) => catalog.get(id).with_context(|| {
            let known: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
            format!("Unknown product '{}' (available: {})", id, known.join(", "))
        }),
        None => catalog.first().context("Catalog is empty"),
    }
}

/// Filesystem loader when an asset directory is given, otherwise synthesised
/// frames tinted with the product's theme color.
fn make_loader(assets: Option<PathBuf>, product: Option<&ProductConfig>) -> Arc<dyn AssetLoader> {
    match assets {
        Some(root) => {
            info!("Loading frames from {}", root.display());
            Arc::new(FsLoader::new(root))
        }
        None => {
            let color = product.and_then(|p| parse_hex_color(&p.colors.from));
            debug!("No asset directory, synthesising frames");
            match color {
                Some(color) => Arc::new(PlaceholderLoader::new(320, 180, color)),
                None => Arc::new(PlaceholderLoader::default()),
            }
        }
    }
}

/// Command: render --product <id> --progress <p> -o <png>
fn cmd_render(catalog: &Catalog, settings: &AnimatorSettings, args: RenderArgs) -> Result<()> {
    let product = pick_product(catalog, args.product.as_deref())?;
    let sequence = product.sequence();
    let frame = sequence.frame_at(args.progress);
    let url = resolve(sequence.base_path(), frame);

    let loader = make_loader(args.assets, Some(product));
    let image = loader
        .load(frame, &url)
        .with_context(|| format!("Failed to load frame {} of {}", frame, product.id))?;

    let asset = FrameAsset::new(frame, url);
    asset.try_claim_for_loading();
    asset.settle(Ok(image))?;

    let (width, height) = args.size;
    let mut compositor = Compositor::new(PixelCanvas::new(), settings.max_dpr);
    compositor.resize(width, height, args.dpr);
    if !compositor.draw(Some(&asset)) {
        bail!("Nothing drawn for frame {} ({}x{})", frame, width, height);
    }

    compositor
        .canvas()
        .save(&args.out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    println!("{} frame {} -> {}", product.id, frame, args.out.display());
    Ok(())
}

/// Command: simulate --product <id>
///
/// Drives the animator with a virtual clock, so runs are reproducible
/// regardless of machine speed.
fn cmd_simulate(catalog: &Catalog, settings: &AnimatorSettings, args: SimulateArgs) -> Result<()> {
    let product = pick_product(catalog, args.product.as_deref())?;
    let next = if args.switch {
        catalog.next_after(&product.id).cloned()
    } else {
        None
    };

    let workers = Arc::new(Workers::with_default_size(settings.workers));
    let source = FrameSource {
        loader: make_loader(args.assets.clone(), Some(product)),
        workers,
    };
    let lock = Arc::new(RecordingInputLock::new());

    // Container one viewport below the top, five viewports tall
    let (width, height) = args.size;
    let viewport = SimulatedViewport::new(height, height, 5.0);

    let mut driver = Driver::new(
        product,
        PixelCanvas::new(),
        viewport,
        lock.clone(),
        source,
        settings.clone(),
    );
    driver.wait_until_loaded();

    let start = Instant::now();
    let mut now = start;
    let stamp = |now: Instant| now.duration_since(start).as_millis();

    report(stamp(now), driver.handle(DriverEvent::Resize { width, height, dpr: 1.0 }, now));

    let mut pending_switch = next;
    loop {
        if !driver.on_visibility(1.0, now) {
            println!("{:>6} ms  autoplay not started", stamp(now));
            break;
        }
        println!(
            "{:>6} ms  autoplay {} ({} ms)",
            stamp(now),
            driver.product().id,
            driver.autoplay_duration().as_millis()
        );

        let half = driver.autoplay_duration() / 2;
        let mut switched = false;
        while let DriverState::Autoplaying { started_at } = driver.state() {
            now += FRAME_INTERVAL;
            if now.duration_since(started_at) >= half {
                if let Some(next) = pending_switch.take() {
                    println!("{:>6} ms  switch to {}", stamp(now), next.id);
                    driver.switch_product(&next);
                    driver.wait_until_loaded();
                    switched = true;
                    break;
                }
            }
            report(stamp(now), driver.handle(DriverEvent::AnimationFrame, now));
        }
        if !switched {
            break;
        }
    }

    // Scroll sweep through the container, two events per position
    let steps = args.steps.max(1);
    for i in 0..=steps {
        now += FRAME_INTERVAL;
        driver
            .viewport_mut()
            .scroll_to_progress(i as f64 / steps as f64);
        report(stamp(now), driver.handle(DriverEvent::Scroll, now));
        report(stamp(now), driver.handle(DriverEvent::AnimationFrame, now));
    }

    let stats = driver.stats();
    println!(
        "ticks {}  redraws {}  painted {}  suppressed {}",
        stats.ticks, stats.redraws, stats.painted, stats.suppressed
    );
    println!(
        "input lock: {} acquisition(s), held {}",
        lock.acquisitions(),
        lock.is_held()
    );

    if let Some(out) = &args.out {
        driver
            .compositor()
            .canvas()
            .save(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("canvas -> {}", out.display());
    }

    driver.shutdown();
    Ok(())
}

fn report(ms: u128, painted: Option<u32>) {
    if let Some(frame) = painted {
        println!("{:>6} ms  frame {}", ms, frame);
    }
}

/// Command: preload [--assets <dir>]
fn cmd_preload(catalog: &Catalog, settings: &AnimatorSettings, assets: Option<PathBuf>) -> Result<()> {
    let workers = Arc::new(Workers::with_default_size(settings.workers));
    let rx = preload_catalog(catalog, make_loader(assets, None), workers);

    let mut last_percent = None;
    for event in rx.iter() {
        match event {
            PreloadEvent::Progress { loaded, total, percent } => {
                if percent % 10 == 0 && last_percent != Some(percent) {
                    println!("{:>3}% ({}/{})", percent, loaded, total);
                    last_percent = Some(percent);
                }
            }
            PreloadEvent::Missing { product, frame, url } => {
                println!("missing: {} frame {} ({})", product, frame, url);
            }
            PreloadEvent::Complete { missing } => {
                if missing > 0 {
                    bail!("{} of {} frames missing", missing, catalog.total_frames());
                }
                println!("all {} frames present", catalog.total_frames());
                return Ok(());
            }
        }
    }

    bail!("Preload stopped before completion")
}
