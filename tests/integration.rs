//! Black-box scenarios driving the core library API end-to-end, one per
//! concrete scenario in the design doc.

use vfsimg::error::VfsError;
use vfsimg::VfsImage;

fn temp_image_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("vfsimg-integration-{tag}-{}.img", std::process::id()))
}

#[test]
fn mkfs_then_info_reports_expected_geometry_and_free_counts() {
    let path = temp_image_path("mkfs-info");
    let _ = std::fs::remove_file(&path);
    VfsImage::mkfs(&path, 100, 50).unwrap();

    let fs = VfsImage::open(&path).unwrap();
    assert_eq!(fs.sb.total_blocks, 100);
    assert_eq!(fs.sb.total_inodes, 50);
    assert_eq!(fs.sb.free_inodes, 48);

    let metadata_blocks = fs.sb.data_region_start;
    let expected_free_blocks = 100 - metadata_blocks - 1;
    assert_eq!(fs.sb.free_blocks, expected_free_blocks);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn touch_duplicate_name_fails_but_other_names_land() {
    let path = temp_image_path("touch-dup");
    let _ = std::fs::remove_file(&path);
    VfsImage::mkfs(&path, 100, 50).unwrap();
    let mut fs = VfsImage::open(&path).unwrap();
    let mut root = fs.read_root().unwrap();

    fs.create_named_file(&mut root, "a.txt", 0o640).unwrap();
    fs.create_named_file(&mut root, "b.txt", 0o640).unwrap();
    let dup = fs.create_named_file(&mut root, "a.txt", 0o640);
    assert!(matches!(dup, Err(VfsError::Exists(_))));

    let entries = fs.list_root(&root).unwrap();
    let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec![".", "..", "a.txt", "b.txt"]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn copy_and_cat_round_trip_small_file_uses_four_blocks() {
    let path = temp_image_path("copy-cat-small");
    let _ = std::fs::remove_file(&path);
    VfsImage::mkfs(&path, 200, 50).unwrap();
    let mut fs = VfsImage::open(&path).unwrap();
    let mut root = fs.read_root().unwrap();

    let payload: Vec<u8> = b"xyz".iter().cycle().take(3584).copied().collect();
    let inode_num = fs.copy_in(&mut root, "dst", &payload, 0o640).unwrap();

    let mut inode = fs.inode_table.read_inode(&mut fs.dev, inode_num).unwrap();
    assert_eq!(inode.size as usize, 3584);
    assert_eq!(inode.blocks, 4);

    let mut out = vec![0u8; inode.size as usize];
    {
        let mut mapper = fs.mapper();
        let n = mapper.read_data(&mut inode, &mut out, 0, inode.size as u64).unwrap();
        assert_eq!(n, payload.len());
    }
    assert_eq!(out, payload);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn copy_cat_trunc_round_trip_restores_free_blocks() {
    let path = temp_image_path("copy-cat-trunc");
    let _ = std::fs::remove_file(&path);
    VfsImage::mkfs(&path, 300, 50).unwrap();
    let mut fs = VfsImage::open(&path).unwrap();
    let mut root = fs.read_root().unwrap();

    let free_before_copy = fs.sb.free_blocks;
    let payload = vec![0x42u8; 12 * 1024];
    let inode_num = fs.copy_in(&mut root, "dst", &payload, 0o640).unwrap();

    let mut inode = fs.inode_table.read_inode(&mut fs.dev, inode_num).unwrap();
    assert_eq!(inode.size as usize, payload.len());

    let mut out = vec![0u8; inode.size as usize];
    {
        let mut mapper = fs.mapper();
        mapper.read_data(&mut inode, &mut out, 0, inode.size as u64).unwrap();
    }
    assert_eq!(out, payload);

    {
        let mut mapper = fs.mapper();
        mapper.truncate(&mut inode).unwrap();
    }
    fs.inode_table.write_inode(&mut fs.dev, inode_num, &inode).unwrap();
    assert_eq!(inode.size, 0);

    let mut out2 = vec![0u8; 0];
    let n = {
        let mut mapper = fs.mapper();
        mapper.read_data(&mut inode, &mut out2, 0, 0).unwrap()
    };
    assert_eq!(n, 0);
    assert_eq!(fs.sb.free_blocks, free_before_copy);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn lsort_orders_entries_alphabetically() {
    let path = temp_image_path("lsort");
    let _ = std::fs::remove_file(&path);
    VfsImage::mkfs(&path, 100, 50).unwrap();
    let mut fs = VfsImage::open(&path).unwrap();
    let mut root = fs.read_root().unwrap();

    for name in ["z.txt", "a.txt", "m.txt"] {
        fs.create_named_file(&mut root, name, 0o640).unwrap();
    }

    let mut entries = fs.list_root(&root).unwrap();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![".", "..", "a.txt", "m.txt", "z.txt"]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn exhausting_inode_bitmap_fails_without_partial_mutation() {
    let path = temp_image_path("inode-exhaust");
    let _ = std::fs::remove_file(&path);
    // 2 reserved (none + root) + 3 usable inodes.
    VfsImage::mkfs(&path, 100, 5).unwrap();
    let mut fs = VfsImage::open(&path).unwrap();
    let mut root = fs.read_root().unwrap();

    for i in 0..3 {
        fs.create_named_file(&mut root, &format!("f{i}.txt"), 0o640).unwrap();
    }
    assert_eq!(fs.sb.free_inodes, 0);

    let free_blocks_before = fs.sb.free_blocks;
    let entries_before = fs.list_root(&root).unwrap().len();

    let result = fs.create_named_file(&mut root, "overflow.txt", 0o640);
    assert!(matches!(result, Err(VfsError::NoSpace(_))));

    assert_eq!(fs.sb.free_inodes, 0);
    assert_eq!(fs.sb.free_blocks, free_blocks_before);
    assert_eq!(fs.list_root(&root).unwrap().len(), entries_before);

    let _ = std::fs::remove_file(&path);
}
