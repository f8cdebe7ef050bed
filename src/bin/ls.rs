//! Lists the root directory's contents in the fixed-width table format,
//! in on-disk scan order.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vfsimg::cli::{format_row, TABLE_HEADER, TABLE_RULE};
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "List files in a vfsimg image")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let root = fs.read_root().context("reading root directory")?;
    let entries = fs.list_root(&root).context("listing root directory")?;

    println!("{TABLE_HEADER}");
    println!("{TABLE_RULE}");
    for entry in entries {
        let inode = fs
            .inode_table
            .read_inode(&mut fs.dev, entry.inode)
            .with_context(|| format!("reading inode {}", entry.inode))?;
        println!("{}", format_row(entry.inode, &inode, &entry.name));
    }

    Ok(())
}
