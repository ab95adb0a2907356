//! KeyCut CLI
//!
//! Keyframe-aware video cutter. Copies packets wherever cuts land on
//! keyframes and re-encodes only the partial GOPs at the edges.
//!
//! # Usage
//!
//! ```bash
//! keycut probe -i video.mp4
//! keycut plan -i video.mp4 -r 00:01:00-00:02:00 --print json
//! keycut cut -i video.mp4 -m remove -r 10-20 -r 1:00-1:30 -f mp4
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use keycut::cli::{self, Cli};
use keycut::utils::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json)?;

    debug!("Starting KeyCut {}", env!("CARGO_PKG_VERSION"));
    cli::run(cli).await
}
