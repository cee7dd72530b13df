mod common;

use std::sync::Arc;
use std::thread;

use common::volume;
use indexed_fs::{DiskInodeKind, FsError, InodeStat, SectorId};

#[test]
fn opening_twice_shares_the_handle() {
    let efs = volume(1024);
    let sector = efs.create_inode(0, false).unwrap();

    let a = efs.inodes().open(sector).unwrap();
    let b = efs.inodes().open(sector).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.open_count(), 2);
    assert_eq!(efs.inodes().len(), 1);

    efs.inodes().close(a);
    assert_eq!(b.open_count(), 1);
    assert_eq!(efs.inodes().len(), 1);

    efs.inodes().close(b);
    assert!(efs.inodes().is_empty());
    efs.unmount();
}

#[test]
fn reopen_counts_as_an_opener() {
    let efs = volume(1024);
    let sector = efs.create_inode(0, false).unwrap();

    let a = efs.inodes().open(sector).unwrap();
    let b = efs.inodes().reopen(&a);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.open_count(), 2);

    efs.inodes().close(a);
    efs.inodes().close(b);
    assert!(efs.inodes().is_empty());
}

#[test]
fn removal_is_deferred_to_last_close() {
    let efs = volume(1024);
    let free = efs.free_sectors();
    let sector = efs.create_inode(100_000, false).unwrap();
    let used = free - efs.free_sectors();
    // 记录所在扇区 + 数据扇区 + 索引块
    assert_eq!(used, 1 + 196 + 3);

    let a = efs.inodes().open(sector).unwrap();
    let b = efs.inodes().open(sector).unwrap();
    a.remove();
    assert!(b.is_removed());
    efs.inodes().close(a);
    assert_eq!(free - efs.free_sectors(), used);

    // 仍可读写
    assert_eq!(b.write_at(0, b"still here"), Ok(10));
    efs.inodes().close(b);
    assert_eq!(efs.free_sectors(), free);
    efs.unmount();
}

#[test]
fn close_persists_the_record() {
    let efs = volume(1024);
    let sector = efs.create_inode(0, false).unwrap();

    let inode = efs.inodes().open(sector).unwrap();
    inode.write_at(1000, b"tail").unwrap();
    efs.inodes().close(inode);

    let inode = efs.inodes().open(sector).unwrap();
    assert_eq!(inode.length(), 1004);
    let mut buf = [0; 4];
    assert_eq!(inode.read_at(1000, &mut buf), 4);
    assert_eq!(&buf, b"tail");
    efs.inodes().close(inode);
}

#[test]
fn open_rejects_non_inode_sector() {
    let efs = volume(1024);
    let sector = SectorId::new(1000);
    assert_eq!(
        efs.inodes().open(sector).err(),
        Some(FsError::NotAnInode(sector))
    );
    assert!(efs.inodes().is_empty());
}

#[test]
fn concurrent_opens_yield_one_handle() {
    let efs = volume(1024);
    let sector = efs.create_inode(0, false).unwrap();

    let handles: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| efs.inodes().open(sector).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(handles[0].open_count(), 8);
    assert_eq!(efs.inodes().len(), 1);

    thread::scope(|s| {
        for handle in handles {
            let efs = &efs;
            s.spawn(move || efs.inodes().close(handle));
        }
    });
    assert!(efs.inodes().is_empty());
}

#[test]
fn failed_create_returns_its_sectors() {
    let efs = volume(64);
    let free = efs.free_sectors();

    assert_eq!(efs.create_inode(100_000, false), Err(FsError::NoSpace));
    assert_eq!(efs.free_sectors(), free);
}

#[test]
fn stat_counts_index_blocks() {
    let efs = volume(1024);
    let sector = efs.create_inode(100_001, false).unwrap();
    let inode = efs.inodes().open(sector).unwrap();

    assert_eq!(
        inode.stat(),
        InodeStat {
            sector,
            kind: DiskInodeKind::File,
            length: 100_001,
            data_sectors: 196,
            total_sectors: 199,
        }
    );
    efs.inodes().close(inode);
}

#[test]
fn root_is_a_directory() {
    let efs = volume(64);
    let root = efs.inodes().open(efs.root()).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.sector(), efs.root());
    efs.inodes().close(root);
}

#[test]
#[should_panic]
fn close_after_last_close_panics() {
    let efs = volume(64);
    let sector = efs.create_inode(0, false).unwrap();
    let a = efs.inodes().open(sector).unwrap();
    let stale = a.clone();
    efs.inodes().close(a);
    efs.inodes().close(stale);
}

#[test]
#[should_panic]
fn unmount_with_open_inode_panics() {
    let efs = volume(64);
    let _root = efs.inodes().open(efs.root()).unwrap();
    efs.unmount();
}
