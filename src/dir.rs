//! The root directory: a flat array of fixed-size name -> inode records
//! stored across the root inode's data blocks. There are no
//! subdirectories, so every operation here takes "the root inode" as an
//! explicit parameter rather than a generic "some directory inode" — that
//! genericity isn't needed and shouldn't be invented.

use log::{debug, trace};

use crate::block::zero_block;
use crate::error::{Result, VfsError};
use crate::geometry::{DIRENTS_PER_BLOCK, DIRENT_SIZE, FILENAME_MAX_LEN};
use crate::inode::Inode;
use crate::inode_data::DataMapper;

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub inode: u32,
    pub name: String,
}

impl DirEntry {
    fn decode(buf: &[u8]) -> Option<Self> {
        debug_assert_eq!(buf.len(), DIRENT_SIZE);
        let inode = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if inode == 0 {
            return None;
        }
        let name_bytes = &buf[4..4 + FILENAME_MAX_LEN + 1];
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
        Some(Self { inode, name })
    }

    pub(crate) fn encode(inode: u32, name: &str, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), DIRENT_SIZE);
        for b in buf.iter_mut() {
            *b = 0;
        }
        buf[0..4].copy_from_slice(&inode.to_le_bytes());
        let bytes = name.as_bytes();
        buf[4..4 + bytes.len()].copy_from_slice(bytes);
        // the terminator and any trailing bytes are already zero.
    }
}

/// `name_is_valid`: non-empty, at most [`FILENAME_MAX_LEN`] bytes, and
/// every byte drawn from `[A-Za-z0-9_.-]`. `.` and `..` are not special
/// here — they only exist as the pre-seeded root entries.
pub fn name_is_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > FILENAME_MAX_LEN {
        return false;
    }
    name.bytes().all(|b| {
        b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'
    })
}

/// Looks up `name` among the root's entries. Returns 0 ("not found") for
/// an invalid name too, matching the defensive behavior the CLI's own
/// validation is expected to have already performed.
pub fn lookup(mapper: &mut DataMapper, root: &Inode, name: &str) -> Result<u32> {
    if !name_is_valid(name) {
        return Ok(0);
    }
    for l in 0..root.blocks as usize {
        let block_num = mapper.get_block_at(root, l)?;
        if block_num == 0 {
            continue;
        }
        let mut buf = zero_block();
        mapper.dev.read_block(block_num, &mut buf)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let off = slot * DIRENT_SIZE;
            if let Some(entry) = DirEntry::decode(&buf[off..off + DIRENT_SIZE]) {
                if entry.name == name {
                    return Ok(entry.inode);
                }
            }
        }
    }
    Ok(0)
}

/// Adds a `name -> inode_num` entry to the root directory, reusing a free
/// slot if one exists, otherwise growing the root's allocation by one
/// block. Persists the root inode if it grew. Caller must have already
/// validated the name and confirmed it's not already present.
pub fn add_entry(mapper: &mut DataMapper, root: &mut Inode, name: &str, inode_num: u32) -> Result<()> {
    if !name_is_valid(name) {
        return Err(VfsError::Invalid(format!("invalid filename: {name}")));
    }

    for l in 0..root.blocks as usize {
        let block_num = mapper.get_block_at(root, l)?;
        let mut buf = zero_block();
        mapper.dev.read_block(block_num, &mut buf)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let off = slot * DIRENT_SIZE;
            if DirEntry::decode(&buf[off..off + DIRENT_SIZE]).is_none() {
                DirEntry::encode(inode_num, name, &mut buf[off..off + DIRENT_SIZE]);
                mapper.dev.write_block(block_num, &buf)?;
                trace!("add_entry: reused free slot for '{name}' -> inode {inode_num}");
                return Ok(());
            }
        }
    }

    // No free slot anywhere: grow the root by one block.
    let new_block = mapper.append_block(root)?;
    let mut buf = zero_block();
    DirEntry::encode(inode_num, name, &mut buf[0..DIRENT_SIZE]);
    mapper.dev.write_block(new_block, &buf)?;
    debug!("add_entry: grew root directory for '{name}' -> inode {inode_num}");
    Ok(())
}

/// Zeroes the entry matching `name`, freeing its slot for reuse. Does not
/// shrink the root's block allocation.
pub fn remove_entry(mapper: &mut DataMapper, root: &Inode, name: &str) -> Result<()> {
    for l in 0..root.blocks as usize {
        let block_num = mapper.get_block_at(root, l)?;
        if block_num == 0 {
            continue;
        }
        let mut buf = zero_block();
        mapper.dev.read_block(block_num, &mut buf)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let off = slot * DIRENT_SIZE;
            if let Some(entry) = DirEntry::decode(&buf[off..off + DIRENT_SIZE]) {
                if entry.name == name {
                    for b in buf[off..off + DIRENT_SIZE].iter_mut() {
                        *b = 0;
                    }
                    mapper.dev.write_block(block_num, &buf)?;
                    debug!("remove_entry: cleared '{name}'");
                    return Ok(());
                }
            }
        }
    }
    Err(VfsError::NotFound(name.to_string()))
}

/// Lists every populated entry in the root directory, in on-disk scan
/// order (not sorted).
pub fn list_entries(mapper: &mut DataMapper, root: &Inode) -> Result<Vec<DirEntry>> {
    let mut out = Vec::new();
    for l in 0..root.blocks as usize {
        let block_num = mapper.get_block_at(root, l)?;
        if block_num == 0 {
            continue;
        }
        let mut buf = zero_block();
        mapper.dev.read_block(block_num, &mut buf)?;
        for slot in 0..DIRENTS_PER_BLOCK {
            let off = slot * DIRENT_SIZE;
            if let Some(entry) = DirEntry::decode(&buf[off..off + DIRENT_SIZE]) {
                out.push(entry);
            }
        }
    }
    Ok(out)
}
