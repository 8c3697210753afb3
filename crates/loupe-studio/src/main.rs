use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use winit::dpi::LogicalSize;

use loupe_engine::logging::{init_logging, LoggingConfig};
use loupe_engine::pipeline::DispatchPriority;
use loupe_viewer::{Minimap, ViewerConfig};

mod host;
mod raster;

use host::StudioConfig;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Priority {
    /// Recompute on the next redraw.
    Render,
    /// Recompute once the pending input batch has been handled.
    Idle,
}

impl From<Priority> for DispatchPriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Render => DispatchPriority::Render,
            Priority::Idle => DispatchPriority::Idle,
        }
    }
}

/// Pan/zoom image viewer.
#[derive(Parser, Debug)]
#[command(name = "loupe", version, about)]
struct Cli {
    /// Image to open (png, jpeg, bmp, gif, ico, tiff, webp).
    path: PathBuf,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// When view recomputation runs.
    #[arg(long, value_enum, default_value_t = Priority::Render)]
    priority: Priority,

    /// Screen pixels kept clear around the fitted image.
    #[arg(long, default_value_t = 0.0)]
    padding: f32,

    /// Log filter, e.g. "debug" or "loupe_engine::pipeline=trace".
    #[arg(long)]
    log: Option<String>,

    /// Start with the minimap hidden (toggle with M).
    #[arg(long)]
    no_minimap: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &cli.log {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging);

    let image = image::open(&cli.path)
        .with_context(|| format!("failed to open {}", cli.path.display()))?
        .to_rgba8();
    log::info!(
        "opened {} ({}x{})",
        cli.path.display(),
        image.width(),
        image.height()
    );

    let title = cli
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "loupe".to_string());

    let config = StudioConfig {
        title,
        initial_size: LogicalSize::new(cli.width, cli.height),
        viewer: ViewerConfig::default()
            .priority(cli.priority.into())
            .fit_padding(cli.padding),
        minimap: Minimap {
            visible: !cli.no_minimap,
            ..Minimap::default()
        },
    };

    host::run(config, image)
}
