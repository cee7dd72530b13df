mod common;

use common::{CountingAllocator, MemCache};
use indexed_fs::{DiskInode, DiskInodeKind, FsError, SECTOR_SIZE};

#[test]
fn everything_allocated_is_released_once() {
    let lengths = [
        0,
        1,
        12 * SECTOR_SIZE,
        12 * SECTOR_SIZE + 1,
        140 * SECTOR_SIZE,
        140 * SECTOR_SIZE + 1,
        (140 + 128) * SECTOR_SIZE,
        (140 + 128) * SECTOR_SIZE + 1,
        300 * SECTOR_SIZE + 7,
    ];

    for length in lengths {
        let cache = MemCache::default();
        let allocator = CountingAllocator::new();
        let mut record = DiskInode::new(DiskInodeKind::File);
        record.grow_to(length, &cache, &allocator).unwrap();
        let allocated = allocator.allocated();
        assert_eq!(allocated, DiskInode::count_total_sectors(record.blocks as usize));
        assert_eq!(record.owned_sectors(&cache), allocated);

        assert_eq!(record.reclaim(&cache, &allocator), allocated, "length={length}");
        assert_eq!(allocator.live(), 0, "length={length}");
        assert_eq!(record.length, 0);
        assert_eq!(record.blocks, 0);
    }
}

#[test]
fn empty_record_releases_nothing() {
    let cache = MemCache::default();
    let allocator = CountingAllocator::new();
    let mut record = DiskInode::new(DiskInodeKind::File);

    assert_eq!(record.reclaim(&cache, &allocator), 0);
}

#[test]
fn reclaimed_record_can_grow_again() {
    let cache = MemCache::default();
    let allocator = CountingAllocator::new();
    let mut record = DiskInode::new(DiskInodeKind::File);

    record.grow_to(200 * SECTOR_SIZE, &cache, &allocator).unwrap();
    record.reclaim(&cache, &allocator);
    record.grow_to(20 * SECTOR_SIZE, &cache, &allocator).unwrap();
    assert_eq!(allocator.live(), DiskInode::count_total_sectors(20));
    record.reclaim(&cache, &allocator);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn empty_index_block_from_failed_growth() {
    let cache = MemCache::default();
    // 12 个直接扇区 + 一级索引块，随后第一个一级索引的数据扇区分配失败
    let allocator = CountingAllocator::with_limit(13);
    let mut record = DiskInode::new(DiskInodeKind::File);

    assert_eq!(
        record.grow_to(20 * SECTOR_SIZE, &cache, &allocator),
        Err(FsError::NoSpace)
    );
    assert_eq!(record.blocks, 12);
    assert_eq!(record.owned_sectors(&cache), 13);
    assert_eq!(record.reclaim(&cache, &allocator), 13);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn empty_second_level_block_from_failed_growth() {
    let cache = MemCache::default();
    // 140 个数据扇区 + 一级索引块 + 二级索引块 + 其下第一个一级索引块
    let allocator = CountingAllocator::with_limit(143);
    let mut record = DiskInode::new(DiskInodeKind::File);

    assert_eq!(
        record.grow_to(200 * SECTOR_SIZE, &cache, &allocator),
        Err(FsError::NoSpace)
    );
    assert_eq!(record.blocks, 140);
    assert_eq!(record.owned_sectors(&cache), 143);
    assert_eq!(record.reclaim(&cache, &allocator), 143);
    assert_eq!(allocator.live(), 0);
}
