//! Top-level orchestration: opening an image, creating one (`mkfs`), and
//! the two composite file operations (`create_named_file`, `unlink`) that
//! the CLI tools call into. Everything here is built purely out of the
//! primitives in `superblock`, `bitmap`, `inode`, `inode_data`, and `dir`.

use std::fs::OpenOptions;
use std::path::Path;

use log::{info, warn};

use crate::bitmap::{Bitmap, Counter};
use crate::block::{zero_block, BlockDevice};
use crate::dir::{self, DirEntry};
use crate::error::{Result, VfsError};
use crate::geometry::{BLOCK_SIZE, DIRENT_SIZE, MAGIC, ROOT_INODE};
use crate::inode::{Inode, InodeTable, MODE_DIR, MODE_FILE};
use crate::inode_data::DataMapper;
use crate::superblock::{Layout, SuperBlock};

pub struct VfsImage {
    pub dev: BlockDevice,
    pub sb: SuperBlock,
    pub block_bitmap: Bitmap,
    pub inode_bitmap: Bitmap,
    pub inode_table: InodeTable,
}

impl VfsImage {
    /// Creates a brand-new image at `path`. Fails with [`VfsError::Exists`]
    /// if the path is already there, [`VfsError::Geometry`] on invalid
    /// sizes.
    pub fn mkfs(path: &Path, total_blocks: u32, total_inodes: u32) -> Result<()> {
        let layout = Layout::compute(total_blocks, total_inodes)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    VfsError::Exists(path.display().to_string())
                } else {
                    VfsError::Io(e)
                }
            })?;

        let mut dev = BlockDevice::new(file);
        dev.set_len_blocks(total_blocks)?;

        // Zero every metadata block explicitly; don't rely on a sparse
        // file reading back as zero on every platform.
        let zero = zero_block();
        for b in 0..layout.data_region_start {
            dev.write_block(b, &zero)?;
        }

        let mut sb = SuperBlock {
            magic: MAGIC,
            version: crate::geometry::FORMAT_VERSION,
            total_blocks,
            total_inodes,
            block_bitmap_start: layout.block_bitmap_start,
            inode_bitmap_start: layout.inode_bitmap_start,
            inode_table_start: layout.inode_table_start,
            data_region_start: layout.data_region_start,
            free_blocks: total_blocks,
            free_inodes: total_inodes,
        };
        dev.write_block(0, &sb.encode())?;

        let block_bitmap = Bitmap {
            start_block: layout.block_bitmap_start,
            num_bits: total_blocks,
            counter: Counter::Blocks,
        };
        let inode_bitmap = Bitmap {
            start_block: layout.inode_bitmap_start,
            num_bits: total_inodes,
            counter: Counter::Inodes,
        };
        let inode_table = InodeTable {
            table_start: layout.inode_table_start,
            total_inodes,
        };

        // Reserve every metadata block (superblock, both bitmaps, inode
        // table). Bits are handed out lowest-first, so this sequence
        // claims exactly blocks 0..data_region_start.
        for _ in 0..layout.data_region_start {
            block_bitmap.allocate(&mut dev, &mut sb)?;
        }
        // Inode 0 ("none") and inode 1 (root) are both permanently
        // reserved. Bitmap bit n and inode number n are the same number.
        let none = inode_bitmap.allocate(&mut dev, &mut sb)?;
        debug_assert_eq!(none, 0);
        let root_bit = inode_bitmap.allocate(&mut dev, &mut sb)?;
        debug_assert_eq!(root_bit, ROOT_INODE);

        let root_data_block = block_bitmap.allocate(&mut dev, &mut sb)?;

        let mut root = Inode::new(MODE_DIR | 0o755);
        root.direct[0] = root_data_block;
        root.blocks = 1;
        // Size tracks allocation, same as for regular files; `ls`/`lsort`
        // print it unmodified, matching a generic inode printer with no
        // directory special-casing.
        root.size = BLOCK_SIZE as u32;

        let mut buf = zero_block();
        DirEntry::encode(ROOT_INODE, ".", &mut buf[0..DIRENT_SIZE]);
        DirEntry::encode(ROOT_INODE, "..", &mut buf[DIRENT_SIZE..2 * DIRENT_SIZE]);
        dev.write_block(root_data_block, &buf)?;

        inode_table.write_inode(&mut dev, ROOT_INODE, &root)?;

        info!(
            "mkfs: {} blocks, {} inodes, data region starts at block {}",
            total_blocks, total_inodes, layout.data_region_start
        );
        Ok(())
    }

    /// Opens an existing image, validating magic/version and that the
    /// file is at least as long as the superblock claims.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut dev = BlockDevice::new(file);
        let mut buf = zero_block();
        dev.read_block(0, &mut buf)?;
        let sb = SuperBlock::decode(&buf)?;

        let actual_len = dev.len_bytes()?;
        let expected_len = sb.total_blocks as u64 * BLOCK_SIZE as u64;
        if actual_len < expected_len {
            return Err(VfsError::BadImage(format!(
                "image is {actual_len} bytes, superblock claims {} blocks ({expected_len} bytes)",
                sb.total_blocks
            )));
        }

        let block_bitmap = Bitmap {
            start_block: sb.block_bitmap_start,
            num_bits: sb.total_blocks,
            counter: Counter::Blocks,
        };
        let inode_bitmap = Bitmap {
            start_block: sb.inode_bitmap_start,
            num_bits: sb.total_inodes,
            counter: Counter::Inodes,
        };
        let inode_table = InodeTable {
            table_start: sb.inode_table_start,
            total_inodes: sb.total_inodes,
        };

        Ok(Self {
            dev,
            sb,
            block_bitmap,
            inode_bitmap,
            inode_table,
        })
    }

    pub fn mapper(&mut self) -> DataMapper<'_> {
        DataMapper {
            dev: &mut self.dev,
            sb: &mut self.sb,
            block_bitmap: &self.block_bitmap,
        }
    }

    pub fn read_root(&mut self) -> Result<Inode> {
        self.inode_table.read_inode(&mut self.dev, ROOT_INODE)
    }

    pub fn write_root(&mut self, root: &Inode) -> Result<()> {
        self.inode_table.write_inode(&mut self.dev, ROOT_INODE, root)
    }

    pub fn lookup(&mut self, root: &Inode, name: &str) -> Result<u32> {
        let mut mapper = self.mapper();
        dir::lookup(&mut mapper, root, name)
    }

    pub fn list_root(&mut self, root: &Inode) -> Result<Vec<DirEntry>> {
        let mut mapper = self.mapper();
        dir::list_entries(&mut mapper, root)
    }

    /// Allocates a fresh, empty regular-file inode with the given
    /// permission bits (masked to 9 bits) and returns its number. Does
    /// not touch the directory.
    pub fn create_empty_file(&mut self, permissions: u16) -> Result<u32> {
        let mode = MODE_FILE | (permissions & crate::inode::MODE_PERM_MASK);
        self.inode_table
            .allocate_inode(&mut self.dev, &mut self.sb, &self.inode_bitmap, mode)
    }

    /// `touch`/`copy`'s shared sequence: reject if `name` already exists,
    /// allocate an empty file, and link it into the root — rolling back
    /// the allocated inode if linking fails.
    pub fn create_named_file(&mut self, root: &mut Inode, name: &str, permissions: u16) -> Result<u32> {
        if self.lookup(root, name)? != 0 {
            return Err(VfsError::Exists(name.to_string()));
        }
        let inode_num = self.create_empty_file(permissions)?;

        let add_result = {
            let mut mapper = self.mapper();
            dir::add_entry(&mut mapper, root, name, inode_num)
        };
        if let Err(e) = add_result {
            warn!("create_named_file: rolling back inode {inode_num} after add_entry failure");
            self.inode_table
                .free_inode(&mut self.dev, &mut self.sb, &self.inode_bitmap, inode_num)?;
            return Err(e);
        }
        self.write_root(root)?;
        Ok(inode_num)
    }

    /// `copy`'s sequence: reject an existing name, allocate an empty
    /// file, write `data` into it, then link it into the root — rolling
    /// back (freeing any written blocks, then the inode) if either the
    /// write or the link fails.
    pub fn copy_in(&mut self, root: &mut Inode, name: &str, data: &[u8], permissions: u16) -> Result<u32> {
        if self.lookup(root, name)? != 0 {
            return Err(VfsError::Exists(name.to_string()));
        }
        let inode_num = self.create_empty_file(permissions)?;
        let mut inode = self.inode_table.read_inode(&mut self.dev, inode_num)?;

        let write_result = {
            let mut mapper = self.mapper();
            mapper.write_data(&mut inode, data, 0)
        };
        if let Err(e) = write_result {
            warn!("copy_in: rolling back inode {inode_num} after write_data failure");
            self.rollback_populated_inode(inode_num, &mut inode)?;
            return Err(e);
        }
        self.inode_table.write_inode(&mut self.dev, inode_num, &inode)?;

        let add_result = {
            let mut mapper = self.mapper();
            dir::add_entry(&mut mapper, root, name, inode_num)
        };
        if let Err(e) = add_result {
            warn!("copy_in: rolling back inode {inode_num} after add_entry failure");
            self.rollback_populated_inode(inode_num, &mut inode)?;
            return Err(e);
        }
        self.write_root(root)?;
        Ok(inode_num)
    }

    fn rollback_populated_inode(&mut self, inode_num: u32, inode: &mut Inode) -> Result<()> {
        {
            let mut mapper = self.mapper();
            mapper.truncate(inode)?;
        }
        self.inode_table
            .free_inode(&mut self.dev, &mut self.sb, &self.inode_bitmap, inode_num)
    }

    /// Looks up `name`, requires it to be a regular file, truncates its
    /// data, removes the directory entry, and frees the inode.
    pub fn unlink(&mut self, root: &Inode, name: &str) -> Result<()> {
        let inode_num = self.lookup(root, name)?;
        if inode_num == 0 {
            return Err(VfsError::NotFound(name.to_string()));
        }
        let mut inode = self.inode_table.read_inode(&mut self.dev, inode_num)?;
        if !inode.is_file() {
            return Err(VfsError::NotFile(name.to_string()));
        }

        {
            let mut mapper = self.mapper();
            mapper.truncate(&mut inode)?;
        }
        self.inode_table.write_inode(&mut self.dev, inode_num, &inode)?;

        {
            let mut mapper = self.mapper();
            dir::remove_entry(&mut mapper, root, name)?;
        }

        self.inode_table
            .free_inode(&mut self.dev, &mut self.sb, &self.inode_bitmap, inode_num)?;
        Ok(())
    }
}
