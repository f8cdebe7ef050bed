//! A small UNIX-style, single-image, flat-namespace block filesystem.
//!
//! The on-disk layout is superblock / block bitmap / inode bitmap / inode
//! table / data region, with direct and single-indirect block addressing
//! per inode. There are no subdirectories: one root directory holds every
//! file. See `DESIGN.md` at the repository root for how each module maps
//! onto that layout.

pub mod bitmap;
pub mod block;
pub mod cli;
pub mod dir;
pub mod error;
pub mod fs;
pub mod geometry;
pub mod inode;
pub mod inode_data;
pub mod superblock;

pub use error::{Result, VfsError};
pub use fs::VfsImage;
