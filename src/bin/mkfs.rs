//! Creates a new image file and formats it with the flat-filesystem
//! layout described in the crate's design doc.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Format a new vfsimg image")]
struct Cli {
    /// Path to the image file to create.
    image: PathBuf,

    /// Total number of blocks in the image.
    total_blocks: u32,

    /// Total number of inodes in the image.
    total_inodes: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    VfsImage::mkfs(&cli.image, cli.total_blocks, cli.total_inodes).with_context(|| {
        format!(
            "formatting {} ({} blocks, {} inodes)",
            cli.image.display(),
            cli.total_blocks,
            cli.total_inodes
        )
    })?;

    println!(
        "Formatted {} ({} blocks, {} inodes)",
        cli.image.display(),
        cli.total_blocks,
        cli.total_inodes
    );
    Ok(())
}
