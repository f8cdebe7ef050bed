//! Inode records and the inode table region.
//!
//! On disk an inode is exactly [`INODE_SIZE`] (64) bytes: a handful of
//! scalar fields, ten direct block pointers, one indirect pointer, and
//! reserved padding so the record divides the block evenly into
//! [`INODES_PER_BLOCK`] slots. Block pointers are stored as 16-bit values
//! (mirroring the reference ext2-style layout this crate is grounded on),
//! which caps an image at 65 535 blocks (~64 MiB at this block size) —
//! generous for a flat, single-directory toy filesystem.

use log::{debug, trace};

use crate::block::{zero_block, Block, BlockDevice};
use crate::error::{Result, VfsError};
use crate::geometry::{DIRECT_BLOCKS, INODES_PER_BLOCK, INODE_SIZE, ROOT_INODE};

pub const MODE_DIR: u16 = 0x4000;
pub const MODE_FILE: u16 = 0x8000;
pub const MODE_TYPE_MASK: u16 = 0xC000;
pub const MODE_PERM_MASK: u16 = 0x01FF;

pub fn now_unix() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

#[derive(Debug, Clone, Copy)]
pub struct Inode {
    pub mode: u16,
    pub owner: u16,
    pub group: u16,
    pub size: u32,
    pub blocks: u16,
    pub created: u32,
    pub modified: u32,
    pub accessed: u32,
    pub direct: [u32; DIRECT_BLOCKS],
    pub indirect: u32,
}

impl Inode {
    pub fn empty() -> Self {
        Self {
            mode: 0,
            owner: 0,
            group: 0,
            size: 0,
            blocks: 0,
            created: 0,
            modified: 0,
            accessed: 0,
            direct: [0; DIRECT_BLOCKS],
            indirect: 0,
        }
    }

    pub fn new(mode: u16) -> Self {
        let now = now_unix();
        Self {
            mode,
            owner: 0,
            group: 0,
            size: 0,
            blocks: 0,
            created: now,
            modified: now,
            accessed: now,
            direct: [0; DIRECT_BLOCKS],
            indirect: 0,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.mode != 0
    }

    pub fn is_dir(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_DIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_FILE
    }

    pub fn permissions(&self) -> u16 {
        self.mode & MODE_PERM_MASK
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), INODE_SIZE);
        for b in buf.iter_mut() {
            *b = 0;
        }
        let mut w = 0usize;
        buf[w..w + 2].copy_from_slice(&self.mode.to_le_bytes());
        w += 2;
        buf[w..w + 2].copy_from_slice(&self.owner.to_le_bytes());
        w += 2;
        buf[w..w + 2].copy_from_slice(&self.group.to_le_bytes());
        w += 2;
        buf[w..w + 4].copy_from_slice(&self.size.to_le_bytes());
        w += 4;
        buf[w..w + 2].copy_from_slice(&self.blocks.to_le_bytes());
        w += 2;
        buf[w..w + 4].copy_from_slice(&self.created.to_le_bytes());
        w += 4;
        buf[w..w + 4].copy_from_slice(&self.modified.to_le_bytes());
        w += 4;
        buf[w..w + 4].copy_from_slice(&self.accessed.to_le_bytes());
        w += 4;
        for &ptr in &self.direct {
            let ptr16 = to_u16_block(ptr)?;
            buf[w..w + 2].copy_from_slice(&ptr16.to_le_bytes());
            w += 2;
        }
        let indirect16 = to_u16_block(self.indirect)?;
        buf[w..w + 2].copy_from_slice(&indirect16.to_le_bytes());
        // remaining bytes stay zeroed (reserved).
        Ok(())
    }

    fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), INODE_SIZE);
        let get_u16 = |off: usize| u16::from_le_bytes(buf[off..off + 2].try_into().unwrap());
        let get_u32 = |off: usize| u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());

        let mode = get_u16(0);
        let owner = get_u16(2);
        let group = get_u16(4);
        let size = get_u32(6);
        let blocks = get_u16(10);
        let created = get_u32(12);
        let modified = get_u32(16);
        let accessed = get_u32(20);
        let mut direct = [0u32; DIRECT_BLOCKS];
        let mut off = 24;
        for slot in direct.iter_mut() {
            *slot = get_u16(off) as u32;
            off += 2;
        }
        let indirect = get_u16(off) as u32;

        Self {
            mode,
            owner,
            group,
            size,
            blocks,
            created,
            modified,
            accessed,
            direct,
            indirect,
        }
    }
}

fn to_u16_block(block: u32) -> Result<u16> {
    u16::try_from(block)
        .map_err(|_| VfsError::Geometry(format!("block number {block} exceeds 16-bit pointer width")))
}

const _: () = assert!(24 + DIRECT_BLOCKS * 2 + 2 <= INODE_SIZE);

/// The contiguous inode-table region: fixed-size records, addressable by
/// 1-based index.
pub struct InodeTable {
    pub table_start: u32,
    pub total_inodes: u32,
}

impl InodeTable {
    fn locate(&self, n: u32) -> Result<(u32, usize)> {
        if n < 1 || n > self.total_inodes {
            return Err(VfsError::OutOfRange(format!(
                "inode {n} out of range [1, {}]",
                self.total_inodes
            )));
        }
        let idx = n - 1;
        let block = self.table_start + idx / INODES_PER_BLOCK as u32;
        let offset = (idx % INODES_PER_BLOCK as u32) as usize * INODE_SIZE;
        Ok((block, offset))
    }

    pub fn read_inode(&self, dev: &mut BlockDevice, n: u32) -> Result<Inode> {
        let (block, offset) = self.locate(n)?;
        let mut buf: Block = zero_block();
        dev.read_block(block, &mut buf)?;
        Ok(Inode::decode(&buf[offset..offset + INODE_SIZE]))
    }

    pub fn write_inode(&self, dev: &mut BlockDevice, n: u32, inode: &Inode) -> Result<()> {
        let (block, offset) = self.locate(n)?;
        let mut buf: Block = zero_block();
        dev.read_block(block, &mut buf)?;
        inode.encode(&mut buf[offset..offset + INODE_SIZE])?;
        dev.write_block(block, &buf)?;
        trace!("write_inode({n})");
        Ok(())
    }

    /// Allocates a new inode bit, writes a freshly initialized record with
    /// `mode` set and every pointer zeroed, and returns its number. Bitmap
    /// bit `n` and inode number `n` are the same number (bit 1 is the root,
    /// per the on-disk convention); only the table slot is offset by one.
    pub fn allocate_inode(
        &self,
        dev: &mut BlockDevice,
        sb: &mut crate::superblock::SuperBlock,
        inode_bitmap: &crate::bitmap::Bitmap,
        mode: u16,
    ) -> Result<u32> {
        let n = inode_bitmap.allocate(dev, sb)?;
        let inode = Inode::new(mode);
        self.write_inode(dev, n, &inode)?;
        debug!("allocate_inode -> {n} (mode {mode:#06x})");
        Ok(n)
    }

    /// Zeroes the inode record and clears its bitmap bit. Caller must have
    /// already freed any data blocks it owned. Refuses to free the root.
    pub fn free_inode(
        &self,
        dev: &mut BlockDevice,
        sb: &mut crate::superblock::SuperBlock,
        inode_bitmap: &crate::bitmap::Bitmap,
        n: u32,
    ) -> Result<()> {
        if n == ROOT_INODE {
            return Err(VfsError::Invalid("cannot free the root inode".into()));
        }
        self.write_inode(dev, n, &Inode::empty())?;
        inode_bitmap.free(dev, sb, n)?;
        debug!("free_inode({n})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_round_trips() {
        let mut inode = Inode::new(MODE_FILE | 0o640);
        inode.size = 12345;
        inode.blocks = 13;
        inode.direct[0] = 42;
        inode.direct[9] = 99;
        inode.indirect = 7;

        let mut buf = [0u8; INODE_SIZE];
        inode.encode(&mut buf).unwrap();
        let decoded = Inode::decode(&buf);

        assert_eq!(decoded.mode, inode.mode);
        assert_eq!(decoded.size, inode.size);
        assert_eq!(decoded.blocks, inode.blocks);
        assert_eq!(decoded.direct, inode.direct);
        assert_eq!(decoded.indirect, inode.indirect);
        assert!(decoded.is_file());
        assert_eq!(decoded.permissions(), 0o640);
    }

    #[test]
    fn mode_helpers_distinguish_dir_and_file() {
        let dir = Inode::new(MODE_DIR | 0o755);
        let file = Inode::new(MODE_FILE | 0o640);
        assert!(dir.is_dir() && !dir.is_file());
        assert!(file.is_file() && !file.is_dir());
    }

    #[test]
    fn inode_locate_rejects_out_of_range() {
        let table = InodeTable {
            table_start: 3,
            total_inodes: 10,
        };
        assert!(matches!(table.locate(0), Err(VfsError::OutOfRange(_))));
        assert!(matches!(table.locate(11), Err(VfsError::OutOfRange(_))));
        assert!(table.locate(1).is_ok());
        assert!(table.locate(10).is_ok());
    }
}
