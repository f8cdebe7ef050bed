//! Removes one or more files from the image.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::error;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Remove files from a vfsimg image")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,

    /// Names to remove.
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let root = fs.read_root().context("reading root directory")?;

    let mut errors = 0;
    for name in &cli.names {
        match fs.unlink(&root, name) {
            Ok(()) => log::debug!("removed '{name}'"),
            Err(e) => {
                error!("rm '{name}' failed: {e}");
                eprintln!("Error removing '{name}': {e}");
                errors += 1;
            }
        }
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
