//! Creates empty regular files in the image's root directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::error;
use vfsimg::dir::name_is_valid;
use vfsimg::VfsImage;

const DEFAULT_PERMISSIONS: u16 = 0o640;

#[derive(Parser)]
#[command(author, version, about = "Create empty files in a vfsimg image")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,

    /// Names to create.
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let mut root = fs.read_root().context("reading root directory")?;

    let mut errors = 0;
    for name in &cli.names {
        if !name_is_valid(name) {
            eprintln!("Invalid filename: {name}");
            errors += 1;
            continue;
        }
        match fs.create_named_file(&mut root, name, DEFAULT_PERMISSIONS) {
            Ok(inode_num) => {
                log::debug!("created '{name}' as inode {inode_num}");
            }
            Err(e) => {
                error!("failed to create '{name}': {e}");
                eprintln!("Error creating '{name}': {e}");
                errors += 1;
            }
        }
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
