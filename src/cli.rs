use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indoc::indoc;

use crate::config::DeskConfig;

const KEYS_HELP: &str = indoc! {"
    Keys:
      mouse  drag a title bar to move, the bottom-right corner to resize
      n      open a new window
      s      scatter desktops rendered since the last pass
      p      attach the pixel reveal to new images
      b      refresh the breathing shadow
      r      back to the desktop
      q/Esc  quit
"};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "retro-desk",
    version = env!("CARGO_PKG_VERSION"),
    about = "Terminal playground for the retro desktop window engine",
    after_help = KEYS_HELP
)]
pub struct PlaygroundCli {
    /// Fallback poll period of the focus highlight.
    #[arg(long = "poll-ms", value_name = "MS", default_value_t = 400)]
    pub poll_ms: u64,

    /// Coalescing window of the geometry lock.
    #[arg(long = "debounce-ms", value_name = "MS", default_value_t = 300)]
    pub debounce_ms: u64,

    /// Number of pixel reveal steps.
    #[arg(long = "reveal-steps", value_name = "N", default_value_t = 8)]
    pub reveal_steps: u32,

    /// Windows on the desktop route.
    #[arg(short = 'w', long = "windows", value_name = "N", default_value_t = 4)]
    pub windows: usize,

    /// Fixed scatter seed, for repeatable layouts.
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// SVG shown in image windows instead of the built-in gradient.
    #[arg(long = "image", value_name = "SVG")]
    pub image: Option<PathBuf>,

    /// Keep the authored layout instead of scattering the desktop.
    #[arg(long = "no-scatter")]
    pub no_scatter: bool,
}

impl TryFrom<&PlaygroundCli> for DeskConfig {
    type Error = String;

    fn try_from(cli: &PlaygroundCli) -> Result<Self, Self::Error> {
        if !(16..=10_000).contains(&cli.poll_ms) {
            return Err("poll-ms must be between 16 and 10000".to_string());
        }
        if cli.debounce_ms > 5_000 {
            return Err("debounce-ms must be at most 5000".to_string());
        }
        if !(1..=16).contains(&cli.reveal_steps) {
            return Err("reveal-steps must be between 1 and 16".to_string());
        }
        if !(1..=12).contains(&cli.windows) {
            return Err("windows must be between 1 and 12".to_string());
        }
        if let Some(path) = &cli.image
            && !path.is_file()
        {
            return Err(format!("image {} does not exist", path.display()));
        }
        Ok(Self {
            focus_poll_interval: Duration::from_millis(cli.poll_ms),
            lock_debounce: Duration::from_millis(cli.debounce_ms),
            reveal_steps: cli.reveal_steps,
            scatter_seed: cli.seed,
            ..Self::default()
        })
    }
}
