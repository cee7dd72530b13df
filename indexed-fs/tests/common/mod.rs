#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use block_dev::RamDisk;
use indexed_fs::{IndexedFileSystem, SECTOR_SIZE, SectorAllocator, SectorCache, SectorId};

/// 未写过的扇区读出来都是这个值，用来发现读了未初始化内容的情况
pub const GARBAGE: u8 = 0xCC;

pub fn volume(sectors: usize) -> IndexedFileSystem {
    IndexedFileSystem::format(Arc::new(RamDisk::new(SECTOR_SIZE, sectors))).unwrap()
}

/// 不经过块设备的扇区缓存
#[derive(Default)]
pub struct MemCache {
    sectors: Mutex<HashMap<SectorId, Vec<u8>>>,
}

impl SectorCache for MemCache {
    fn read(&self, sector: SectorId, buf: &mut [u8]) {
        assert_eq!(buf.len(), SECTOR_SIZE);
        match self.sectors.lock().unwrap().get(&sector) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(GARBAGE),
        }
    }

    fn write(&self, sector: SectorId, buf: &[u8]) {
        assert_eq!(buf.len(), SECTOR_SIZE);
        self.sectors.lock().unwrap().insert(sector, buf.to_vec());
    }
}

type WriteHook = Box<dyn Fn(SectorId, &[u8]) + Send + Sync>;

/// 每次写入扇区之后调用 `hook`，用来在写路径中途插入别的操作
pub struct HookCache {
    inner: MemCache,
    hook: WriteHook,
}

impl HookCache {
    pub fn new(hook: impl Fn(SectorId, &[u8]) + Send + Sync + 'static) -> Self {
        Self {
            inner: MemCache::default(),
            hook: Box::new(hook),
        }
    }
}

impl SectorCache for HookCache {
    fn read(&self, sector: SectorId, buf: &mut [u8]) {
        self.inner.read(sector, buf);
    }

    fn write(&self, sector: SectorId, buf: &[u8]) {
        self.inner.write(sector, buf);
        (self.hook)(sector, buf);
    }
}

/// 记录分配情况的分配器：扇区号从 1 开始递增，
/// 可以设置最多分配多少次，归还未分配的扇区会 panic
pub struct CountingAllocator {
    next: AtomicU32,
    limit: AtomicUsize,
    live: Mutex<HashSet<SectorId>>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            next: AtomicU32::new(1),
            limit: AtomicUsize::new(limit),
            live: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::SeqCst);
    }

    /// 目前分配出去还没归还的扇区数
    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// 累计分配次数
    pub fn allocated(&self) -> usize {
        self.next.load(Ordering::SeqCst) as usize - 1
    }
}

impl SectorAllocator for CountingAllocator {
    fn allocate(&self) -> Option<SectorId> {
        if self.allocated() >= self.limit.load(Ordering::SeqCst) {
            return None;
        }
        let sector = SectorId::new(self.next.fetch_add(1, Ordering::SeqCst));
        self.live.lock().unwrap().insert(sector);
        Some(sector)
    }

    fn release(&self, sector: SectorId) {
        assert!(
            self.live.lock().unwrap().remove(&sector),
            "{sector:?} released twice"
        );
    }
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
