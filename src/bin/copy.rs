//! Copies a file from the host filesystem into the image's root directory.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vfsimg::inode::MODE_PERM_MASK;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Copy a host file into a vfsimg image")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,

    /// Host file to read.
    source: PathBuf,

    /// Name to create inside the image.
    dest_name: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let metadata =
        std::fs::metadata(&cli.source).with_context(|| format!("stat {}", cli.source.display()))?;
    let permissions = metadata.permissions().mode() as u16 & MODE_PERM_MASK;
    let data = std::fs::read(&cli.source).with_context(|| format!("reading {}", cli.source.display()))?;

    let mut fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let mut root = fs.read_root().context("reading root directory")?;

    fs.copy_in(&mut root, &cli.dest_name, &data, permissions)
        .with_context(|| format!("copying '{}' into image as '{}'", cli.source.display(), cli.dest_name))?;

    println!(
        "Copied {} ({} bytes) to '{}'",
        cli.source.display(),
        data.len(),
        cli.dest_name
    );
    Ok(())
}
