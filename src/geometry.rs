//! Fixed on-disk geometry constants. These are part of the wire format and
//! must never change without bumping [`FORMAT_VERSION`].

/// Size in bytes of every block on disk, including block 0 (the superblock).
pub const BLOCK_SIZE: usize = 1024;

/// Magic tag stored in the superblock, identifying this as a vfsimg image.
pub const MAGIC: u32 = 0x5646_5331; // ASCII-ish "VFS1"

/// On-disk format version. Bump on any incompatible layout change.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized size in bytes of one [`crate::inode::Inode`] record.
pub const INODE_SIZE: usize = 64;

/// Number of inode records packed into one block of the inode table.
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// Longest filename, not counting the NUL terminator.
pub const FILENAME_MAX_LEN: usize = 27;

/// Serialized size in bytes of one [`crate::dir::DirEntry`] record.
pub const DIRENT_SIZE: usize = 32;

/// Number of directory entries packed into one data block.
pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;

/// Direct block pointers held inline in every inode.
pub const DIRECT_BLOCKS: usize = 10;

/// Block-number slots held in one indirect block.
pub const INDIRECT_ENTRIES: usize = BLOCK_SIZE / 4;

/// Largest logical block index addressable by an inode (direct + indirect).
pub const MAX_LOGICAL_BLOCKS: usize = DIRECT_BLOCKS + INDIRECT_ENTRIES;

/// Largest file size representable under direct + single-indirect addressing.
pub const MAX_FILE_SIZE: u64 = (MAX_LOGICAL_BLOCKS * BLOCK_SIZE) as u64;

/// Inode number of the (only) root directory. Inode 0 is reserved as "none".
pub const ROOT_INODE: u32 = 1;

/// Number of bits a single bitmap block can represent.
pub const BITS_PER_BITMAP_BLOCK: u32 = (BLOCK_SIZE * 8) as u32;

/// Divide-and-round-up, used throughout layout math.
pub const fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}
