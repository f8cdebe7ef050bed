//! The first block of every image: magic, version, geometry, and the free
//! counters. Fields are encoded field-by-field as little-endian integers —
//! never by transmuting the host's in-memory layout onto disk.

use crate::block::{zero_block, Block};
use crate::error::{Result, VfsError};
use crate::geometry::{ceil_div, BITS_PER_BITMAP_BLOCK, BLOCK_SIZE, FORMAT_VERSION, INODES_PER_BLOCK, MAGIC};

#[derive(Debug, Clone, Copy)]
pub struct SuperBlock {
    pub magic: u32,
    pub version: u32,
    pub total_blocks: u32,
    pub total_inodes: u32,
    pub block_bitmap_start: u32,
    pub inode_bitmap_start: u32,
    pub inode_table_start: u32,
    pub data_region_start: u32,
    pub free_blocks: u32,
    pub free_inodes: u32,
}

/// Result of laying out a fresh image's fixed regions.
pub struct Layout {
    pub block_bitmap_start: u32,
    pub block_bitmap_blocks: u32,
    pub inode_bitmap_start: u32,
    pub inode_bitmap_blocks: u32,
    pub inode_table_start: u32,
    pub inode_table_blocks: u32,
    pub data_region_start: u32,
}

impl Layout {
    /// Computes the deterministic region layout for `total_blocks` /
    /// `total_inodes`, per the table in the spec's superblock section.
    /// Fails with [`VfsError::Geometry`] if the geometry can't hold at
    /// least one data block, or if `total_inodes` exceeds `total_blocks`.
    pub fn compute(total_blocks: u32, total_inodes: u32) -> Result<Self> {
        if total_inodes == 0 {
            return Err(VfsError::Geometry("total_inodes must be at least 1".into()));
        }
        if total_inodes > total_blocks {
            return Err(VfsError::Geometry(
                "total_inodes must not exceed total_blocks".into(),
            ));
        }

        let block_bitmap_start = 1;
        let block_bitmap_blocks = ceil_div(total_blocks, BITS_PER_BITMAP_BLOCK).max(1);
        let inode_bitmap_start = block_bitmap_start + block_bitmap_blocks;
        let inode_bitmap_blocks = ceil_div(total_inodes, BITS_PER_BITMAP_BLOCK).max(1);
        let inode_table_start = inode_bitmap_start + inode_bitmap_blocks;
        let inode_table_blocks = ceil_div(total_inodes, INODES_PER_BLOCK as u32).max(1);
        let data_region_start = inode_table_start + inode_table_blocks;

        if data_region_start >= total_blocks {
            return Err(VfsError::Geometry(format!(
                "total_blocks={total_blocks} too small to fit metadata ({data_region_start} blocks) plus at least one data block"
            )));
        }

        Ok(Self {
            block_bitmap_start,
            block_bitmap_blocks,
            inode_bitmap_start,
            inode_bitmap_blocks,
            inode_table_start,
            inode_table_blocks,
            data_region_start,
        })
    }
}

impl SuperBlock {
    pub fn encode(&self) -> Block {
        let mut buf = zero_block();
        let mut w = 0usize;
        let mut put = |v: u32, buf: &mut Block, w: &mut usize| {
            buf[*w..*w + 4].copy_from_slice(&v.to_le_bytes());
            *w += 4;
        };
        put(self.magic, &mut buf, &mut w);
        put(self.version, &mut buf, &mut w);
        put(self.total_blocks, &mut buf, &mut w);
        put(self.total_inodes, &mut buf, &mut w);
        put(self.block_bitmap_start, &mut buf, &mut w);
        put(self.inode_bitmap_start, &mut buf, &mut w);
        put(self.inode_table_start, &mut buf, &mut w);
        put(self.data_region_start, &mut buf, &mut w);
        put(self.free_blocks, &mut buf, &mut w);
        put(self.free_inodes, &mut buf, &mut w);
        buf
    }

    pub fn decode(buf: &Block) -> Result<Self> {
        let get = |off: usize| -> u32 { u32::from_le_bytes(buf[off..off + 4].try_into().unwrap()) };
        let magic = get(0);
        if magic != MAGIC {
            return Err(VfsError::BadImage(format!(
                "bad magic: expected {MAGIC:#010x}, found {magic:#010x}"
            )));
        }
        let version = get(4);
        if version != FORMAT_VERSION {
            return Err(VfsError::BadImage(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        Ok(Self {
            magic,
            version,
            total_blocks: get(8),
            total_inodes: get(12),
            block_bitmap_start: get(16),
            inode_bitmap_start: get(20),
            inode_table_start: get(24),
            data_region_start: get(28),
            free_blocks: get(32),
            free_inodes: get(36),
        })
    }

    pub fn block_bitmap_blocks(&self) -> u32 {
        self.inode_bitmap_start - self.block_bitmap_start
    }

    pub fn inode_bitmap_blocks(&self) -> u32 {
        self.inode_table_start - self.inode_bitmap_start
    }

    pub fn inode_table_blocks(&self) -> u32 {
        self.data_region_start - self.inode_table_start
    }

    pub fn data_blocks(&self) -> u32 {
        self.total_blocks - self.data_region_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_rejects_too_many_inodes() {
        assert!(matches!(
            Layout::compute(10, 20),
            Err(VfsError::Geometry(_))
        ));
    }

    #[test]
    fn layout_rejects_tiny_images() {
        assert!(matches!(Layout::compute(1, 1), Err(VfsError::Geometry(_))));
    }

    #[test]
    fn superblock_round_trips() {
        let sb = SuperBlock {
            magic: MAGIC,
            version: FORMAT_VERSION,
            total_blocks: 100,
            total_inodes: 50,
            block_bitmap_start: 1,
            inode_bitmap_start: 2,
            inode_table_start: 3,
            data_region_start: 7,
            free_blocks: 90,
            free_inodes: 48,
        };
        let buf = sb.encode();
        assert_eq!(buf.len(), BLOCK_SIZE);
        let decoded = SuperBlock::decode(&buf).unwrap();
        assert_eq!(decoded.total_blocks, sb.total_blocks);
        assert_eq!(decoded.free_inodes, sb.free_inodes);
    }

    #[test]
    fn superblock_rejects_bad_magic() {
        let buf = zero_block();
        assert!(matches!(SuperBlock::decode(&buf), Err(VfsError::BadImage(_))));
    }
}
