//! Writes the contents of one or more files in the image to stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::error;
use vfsimg::VfsImage;

#[derive(Parser)]
#[command(author, version, about = "Print the contents of files in a vfsimg image")]
struct Cli {
    /// Path to the image file.
    image: PathBuf,

    /// Names to print.
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut fs = VfsImage::open(&cli.image).with_context(|| format!("opening {}", cli.image.display()))?;
    let root = fs.read_root().context("reading root directory")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut errors = 0;

    for name in &cli.names {
        if let Err(e) = cat_one(&mut fs, &root, name, &mut out) {
            error!("cat '{name}' failed: {e}");
            eprintln!("Error reading '{name}': {e}");
            errors += 1;
        }
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cat_one(fs: &mut VfsImage, root: &vfsimg::inode::Inode, name: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let inode_num = fs.lookup(root, name)?;
    if inode_num == 0 {
        anyhow::bail!("not found");
    }
    let mut inode = fs.inode_table.read_inode(&mut fs.dev, inode_num)?;
    if !inode.is_file() {
        anyhow::bail!("not a regular file");
    }

    let mut buf = vec![0u8; inode.size as usize];
    {
        let mut mapper = fs.mapper();
        mapper.read_data(&mut inode, &mut buf, 0, inode.size as u64)?;
    }

    out.write_all(&buf).context("writing to stdout")?;
    Ok(())
}
