//! Inode data addressing: the direct + single-indirect mapping from a
//! logical block index to a physical block number, and the operations
//! built on top of it (`append_block`, `write_data`, `read_data`,
//! `truncate`). This is the hardest part of the on-disk format — see the
//! module-level invariants in the design doc for why the indirect block
//! itself is counted in `inode.blocks`.

use log::{trace, warn};

use crate::bitmap::Bitmap;
use crate::block::{zero_block, Block, BlockDevice};
use crate::error::{Result, VfsError};
use crate::geometry::{BLOCK_SIZE, DIRECT_BLOCKS, INDIRECT_ENTRIES, MAX_FILE_SIZE};
use crate::inode::{now_unix, Inode};
use crate::superblock::SuperBlock;

/// Handle bundling the pieces `append_block`/`write_data`/`read_data`/
/// `truncate` all need: the block device, the superblock (for the free
/// counter), and the block bitmap.
pub struct DataMapper<'a> {
    pub dev: &'a mut BlockDevice,
    pub sb: &'a mut SuperBlock,
    pub block_bitmap: &'a Bitmap,
}

impl<'a> DataMapper<'a> {
    fn alloc_block(&mut self) -> Result<u32> {
        // The block bitmap spans every block in the image (bit i <-> block
        // i); metadata blocks are pre-marked allocated at mkfs time, so a
        // plain lowest-clear-bit scan naturally starts handing out blocks
        // at data_region_start and the returned bit *is* the absolute
        // block number.
        self.block_bitmap.allocate(self.dev, self.sb)
    }

    fn free_block(&mut self, block_num: u32) -> Result<()> {
        self.block_bitmap.free(self.dev, self.sb, block_num)
    }

    /// Pure lookup: logical block index `l` -> physical block number, or 0
    /// for a hole / beyond the current allocation. Never allocates.
    pub fn get_block_at(&mut self, inode: &Inode, l: usize) -> Result<u32> {
        if l < DIRECT_BLOCKS {
            return Ok(inode.direct[l]);
        }
        let k = l - DIRECT_BLOCKS;
        if k >= INDIRECT_ENTRIES {
            return Err(VfsError::OutOfRange(format!(
                "logical block {l} beyond maximum file size"
            )));
        }
        if inode.indirect == 0 {
            return Ok(0);
        }
        let mut buf = zero_block();
        self.dev.read_block(inode.indirect, &mut buf)?;
        Ok(read_indirect_slot(&buf, k))
    }

    /// Grows the inode's allocation by exactly one logical block, returning
    /// the physical block number of the newly allocated slice. Persists any
    /// modified indirect block; the caller persists the inode record.
    pub fn append_block(&mut self, inode: &mut Inode) -> Result<u32> {
        let l = self.first_unallocated_slot(inode)?;

        let mut reserved_indirect_here = false;
        if l >= DIRECT_BLOCKS && inode.indirect == 0 {
            let indirect_block = self.alloc_block()?;
            self.dev.write_block(indirect_block, &zero_block())?;
            inode.indirect = indirect_block;
            inode.blocks += 1;
            reserved_indirect_here = true;
        }

        let data_block = match self.alloc_block() {
            Ok(b) => b,
            Err(e) => {
                // Roll back the indirect block we just reserved for this
                // call, so a failed append leaves no orphan.
                if reserved_indirect_here {
                    warn!("append_block: rolling back freshly allocated indirect block");
                    self.free_block(inode.indirect)?;
                    inode.indirect = 0;
                    inode.blocks -= 1;
                }
                return Err(e);
            }
        };

        if l < DIRECT_BLOCKS {
            inode.direct[l] = data_block;
        } else {
            let k = l - DIRECT_BLOCKS;
            let mut buf = zero_block();
            self.dev.read_block(inode.indirect, &mut buf)?;
            write_indirect_slot(&mut buf, k, data_block);
            self.dev.write_block(inode.indirect, &buf)?;
        }
        inode.blocks += 1;
        trace!("append_block -> logical {l}, physical {data_block}");
        Ok(data_block)
    }

    fn first_unallocated_slot(&mut self, inode: &Inode) -> Result<usize> {
        for l in 0..DIRECT_BLOCKS {
            if inode.direct[l] == 0 {
                return Ok(l);
            }
        }
        if inode.indirect == 0 {
            return Ok(DIRECT_BLOCKS);
        }
        let mut buf = zero_block();
        self.dev.read_block(inode.indirect, &mut buf)?;
        for k in 0..INDIRECT_ENTRIES {
            if read_indirect_slot(&buf, k) == 0 {
                return Ok(DIRECT_BLOCKS + k);
            }
        }
        Err(VfsError::NoSpace("inode already at maximum file size"))
    }

    /// Writes `data` starting at `offset`, growing the allocation as
    /// needed. Updates `inode.size`. Caller persists the inode afterward.
    pub fn write_data(&mut self, inode: &mut Inode, data: &[u8], offset: u64) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(VfsError::TooLarge {
                requested: data.len() as u64,
                offset,
                max: MAX_FILE_SIZE,
            })?;
        if end > MAX_FILE_SIZE {
            return Err(VfsError::TooLarge {
                requested: data.len() as u64,
                offset,
                max: MAX_FILE_SIZE,
            });
        }

        let mut written = 0usize;
        while written < data.len() {
            let pos = offset + written as u64;
            let l = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = (BLOCK_SIZE - in_block).min(data.len() - written);

            let mut block_num = self.get_block_at(inode, l)?;
            while block_num == 0 {
                let appended = self.append_block(inode)?;
                block_num = self.get_block_at(inode, l)?;
                debug_assert_eq!(appended, block_num);
            }

            if in_block == 0 && chunk == BLOCK_SIZE {
                let mut buf: Block = zero_block();
                buf.copy_from_slice(&data[written..written + chunk]);
                self.dev.write_block(block_num, &buf)?;
            } else {
                let mut buf = zero_block();
                self.dev.read_block(block_num, &mut buf)?;
                buf[in_block..in_block + chunk].copy_from_slice(&data[written..written + chunk]);
                self.dev.write_block(block_num, &buf)?;
            }

            written += chunk;
        }

        inode.size = inode.size.max((end) as u32);
        inode.modified = now_unix();
        Ok(())
    }

    /// Reads up to `len` bytes starting at `offset`, clamped to the
    /// inode's recorded size. Returns the number of bytes copied into
    /// `out` (which must be at least `len` long).
    pub fn read_data(&mut self, inode: &mut Inode, out: &mut [u8], offset: u64, len: u64) -> Result<usize> {
        if offset >= inode.size as u64 {
            return Ok(0);
        }
        let len = len.min(inode.size as u64 - offset);
        let mut read = 0usize;
        while (read as u64) < len {
            let pos = offset + read as u64;
            let l = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let chunk = ((BLOCK_SIZE - in_block) as u64).min(len - read as u64) as usize;

            let block_num = self.get_block_at(inode, l)?;
            if block_num == 0 {
                return Err(VfsError::Corrupt(format!(
                    "hole at logical block {l} within inode's recorded size"
                )));
            }
            let mut buf = zero_block();
            self.dev.read_block(block_num, &mut buf)?;
            out[read..read + chunk].copy_from_slice(&buf[in_block..in_block + chunk]);
            read += chunk;
        }
        inode.accessed = now_unix();
        Ok(read)
    }

    /// Releases every block owned by `inode` and resets its size/blocks/
    /// pointers to zero. Idempotent: a never-written inode is untouched.
    pub fn truncate(&mut self, inode: &mut Inode) -> Result<()> {
        for slot in inode.direct.iter_mut() {
            if *slot != 0 {
                self.free_block(*slot)?;
                *slot = 0;
            }
        }
        if inode.indirect != 0 {
            let mut buf = zero_block();
            self.dev.read_block(inode.indirect, &mut buf)?;
            for k in 0..INDIRECT_ENTRIES {
                let ptr = read_indirect_slot(&buf, k);
                if ptr != 0 {
                    self.free_block(ptr)?;
                }
            }
            self.free_block(inode.indirect)?;
            inode.indirect = 0;
        }
        inode.size = 0;
        inode.blocks = 0;
        inode.modified = now_unix();
        Ok(())
    }
}

fn read_indirect_slot(buf: &Block, k: usize) -> u32 {
    let off = k * 4;
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

fn write_indirect_slot(buf: &mut Block, k: usize, value: u32) {
    let off = k * 4;
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Counter;
    use crate::geometry::{FORMAT_VERSION, MAGIC};
    use std::fs::OpenOptions;

    fn harness(total_blocks: u32) -> (BlockDevice, SuperBlock, Bitmap) {
        let path = std::env::temp_dir().join(format!(
            "vfsimg-inode-data-test-{}-{}.img",
            std::process::id(),
            total_blocks
        ));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        let mut dev = BlockDevice::new(file);
        dev.set_len_blocks(total_blocks + 1).unwrap();
        let sb = SuperBlock {
            magic: MAGIC,
            version: FORMAT_VERSION,
            total_blocks: total_blocks + 1,
            total_inodes: 8,
            block_bitmap_start: 1,
            inode_bitmap_start: 2,
            inode_table_start: 3,
            data_region_start: 4,
            free_blocks: total_blocks,
            free_inodes: 8,
        };
        let bitmap = Bitmap {
            start_block: 1,
            num_bits: total_blocks,
            counter: Counter::Blocks,
        };
        let _ = std::fs::remove_file(&path);
        (dev, sb, bitmap)
    }

    #[test]
    fn write_then_read_within_direct_blocks() {
        let (mut dev, mut sb, bitmap) = harness(32);
        let mut mapper = DataMapper {
            dev: &mut dev,
            sb: &mut sb,
            block_bitmap: &bitmap,
        };
        let mut inode = Inode::new(crate::inode::MODE_FILE | 0o640);
        let payload = b"hello, flat filesystem".repeat(40);
        mapper.write_data(&mut inode, &payload, 0).unwrap();
        assert_eq!(inode.size as usize, payload.len());

        let mut out = vec![0u8; payload.len()];
        let n = mapper.read_data(&mut inode, &mut out, 0, payload.len() as u64).unwrap();
        assert_eq!(n, payload.len());
        assert_eq!(out, payload);
    }

    #[test]
    fn crossing_into_indirect_block_counts_blocks_correctly() {
        let (mut dev, mut sb, bitmap) = harness(300);
        let mut mapper = DataMapper {
            dev: &mut dev,
            sb: &mut sb,
            block_bitmap: &bitmap,
        };
        let mut inode = Inode::new(crate::inode::MODE_FILE | 0o640);
        let payload = vec![0x5au8; 10 * 1024 + 1];
        mapper.write_data(&mut inode, &payload, 0).unwrap();
        assert_eq!(inode.blocks, 12); // 10 direct + indirect block + 1 data block
        assert_eq!(inode.size as usize, payload.len());

        let mut out = vec![0u8; payload.len()];
        let n = mapper.read_data(&mut inode, &mut out, 0, payload.len() as u64).unwrap();
        assert_eq!(n, payload.len());
        assert_eq!(out, payload);
    }

    #[test]
    fn write_beyond_max_size_fails() {
        let (mut dev, mut sb, bitmap) = harness(300);
        let mut mapper = DataMapper {
            dev: &mut dev,
            sb: &mut sb,
            block_bitmap: &bitmap,
        };
        let mut inode = Inode::new(crate::inode::MODE_FILE | 0o640);
        let payload = vec![0u8; MAX_FILE_SIZE as usize + 1];
        assert!(matches!(
            mapper.write_data(&mut inode, &payload, 0),
            Err(VfsError::TooLarge { .. })
        ));
    }

    #[test]
    fn truncate_releases_all_blocks_and_is_idempotent() {
        let (mut dev, mut sb, bitmap) = harness(300);
        let free_before;
        {
            let mut mapper = DataMapper {
                dev: &mut dev,
                sb: &mut sb,
                block_bitmap: &bitmap,
            };
            free_before = mapper.sb.free_blocks;
            let mut inode = Inode::new(crate::inode::MODE_FILE | 0o640);
            let payload = vec![0xAAu8; 12 * 1024];
            mapper.write_data(&mut inode, &payload, 0).unwrap();
            mapper.truncate(&mut inode).unwrap();
            assert_eq!(inode.size, 0);
            assert_eq!(inode.blocks, 0);
            assert!(inode.direct.iter().all(|&p| p == 0));
            assert_eq!(inode.indirect, 0);
            assert_eq!(mapper.sb.free_blocks, free_before);

            // idempotent: truncating again touches nothing further.
            mapper.truncate(&mut inode).unwrap();
            assert_eq!(mapper.sb.free_blocks, free_before);
        }
    }
}
