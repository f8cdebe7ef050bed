//! Reports an image's geometry and free-space counters.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Show image geometry and free-space counters")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let sb = &fs.sb;

    println!("image:              {}", cli.image.display());
    println!("magic:              {:#010x}", sb.magic);
    println!("version:            {}", sb.version);
    println!("total blocks:       {}", sb.total_blocks);
    println!("total inodes:       {}", sb.total_inodes);
    println!(
        "block bitmap:       block {} ({} blocks)",
        sb.block_bitmap_start,
        sb.block_bitmap_blocks()
    );
    println!(
        "inode bitmap:       block {} ({} blocks)",
        sb.inode_bitmap_start,
        sb.inode_bitmap_blocks()
    );
    println!(
        "inode table:        block {} ({} blocks)",
        sb.inode_table_start,
        sb.inode_table_blocks()
    );
    println!(
        "data region:        block {} ({} blocks)",
        sb.data_region_start,
        sb.data_blocks()
    );
    println!("free blocks:        {}", sb.free_blocks);
    println!("free inodes:        {}", sb.free_inodes);

    Ok(())
}
