//! Truncates one or more files in the image to zero length, keeping the
//! file (and its name) in place.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::error;
use vfsimg::error::VfsError;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Truncate files in a vfsimg image to zero length")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,

    /// Names to truncate.
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
        if let Err(e) = trunc_one(&mut fs, &root, name) {
            error!("trunc '{name}' failed: {e}");
            eprintln!("Error truncating '{name}': {e}");
            errors += 1;
        }
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn trunc_one(fs: &mut VfsImage, root: &vfsimg::inode::Inode, name: &str) -> vfsimg::Result<()> {
    let inode_num = fs.lookup(root, name)?;
    if inode_num == 0 {
        return Err(VfsError::NotFound(name.to_string()));
    }
    let mut inode = fs.inode_table.read_inode(&mut fs.dev, inode_num)?;
    if !inode.is_file() {
        return Err(VfsError::NotFile(name.to_string()));
    }

    {
        let mut mapper = fs.mapper();
        mapper.truncate(&mut inode)?;
    }
    fs.inode_table.write_inode(&mut fs.dev, inode_num, &inode)?;
    Ok(())
}
