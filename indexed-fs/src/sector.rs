//! # 扇区抽象与扇区缓存层
//!
//! inode 层对存储的所有访问都以整扇区为单位，经过 [`SectorCache`]。
//! [`BlockCache`] 是它的默认实现：内存中缓存若干扇区，写操作先落在缓存上，
//! 在被踢出、`sync_all` 或缓存销毁时才写回块设备。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use derive_more::{From, Into};
use spin::Mutex;

use crate::{DataBlock, SECTOR_SIZE};

/// 扇区号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct SectorId(u32);

impl SectorId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<SectorId> for usize {
    fn from(id: SectorId) -> Self {
        id.0 as usize
    }
}

/// 扇区缓存特质：每次调用读写恰好一个扇区
pub trait SectorCache: Send + Sync {
    fn read(&self, sector: SectorId, buf: &mut [u8]);
    fn write(&self, sector: SectorId, buf: &[u8]);
}

/// 内存中的扇区
struct CachedSector {
    /// 缓存的数据
    data: DataBlock,
    /// 对应的扇区号
    id: SectorId,
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    /// 是否为脏块
    modified: bool,
}

impl CachedSector {
    fn new(id: SectorId, dev: Arc<dyn BlockDevice>) -> Self {
        let mut data = [0; SECTOR_SIZE];
        dev.read_block(id.into(), &mut data);

        Self {
            data,
            id,
            dev,
            modified: false,
        }
    }

    fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.dev.write_block(self.id.into(), &self.data);
        }
    }
}

impl Drop for CachedSector {
    fn drop(&mut self) {
        self.sync();
    }
}

/// 块缓存，调度扇区的缓存与写回
pub struct BlockCache {
    dev: Arc<dyn BlockDevice>,
    queue: Mutex<Vec<(SectorId, Arc<Mutex<CachedSector>>)>>,
}

impl BlockCache {
    /// 缓存扇区个数的上限
    const CAPACITY: usize = 64;

    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            dev,
            queue: Mutex::new(Vec::with_capacity(Self::CAPACITY)),
        }
    }

    /// 把全部脏扇区写回设备
    pub fn sync_all(&self) {
        self.queue
            .lock()
            .iter()
            .for_each(|(_, cache)| cache.lock().sync());
    }

    // 缓存调度策略：踢走闲置扇区
    fn get(&self, id: SectorId) -> Arc<Mutex<CachedSector>> {
        let mut queue = self.queue.lock();

        if let Some(cache) = queue
            .iter()
            .find_map(|(sid, cache)| (id == *sid).then_some(cache))
        {
            return Arc::clone(cache);
        }

        // 触及上限，写回一个扇区
        if queue.len() == Self::CAPACITY {
            let index = queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1) // 没有其它引用的才能写回
                .expect("run out of block cache");
            queue.remove(index);
        }

        let cache = Arc::new(Mutex::new(CachedSector::new(id, self.dev.clone())));
        queue.push((id, cache.clone()));

        cache
    }
}

impl SectorCache for BlockCache {
    fn read(&self, sector: SectorId, buf: &mut [u8]) {
        assert_eq!(buf.len(), SECTOR_SIZE);
        buf.copy_from_slice(&self.get(sector).lock().data);
    }

    fn write(&self, sector: SectorId, buf: &[u8]) {
        assert_eq!(buf.len(), SECTOR_SIZE);
        let cache = self.get(sector);
        let mut cache = cache.lock();
        cache.data.copy_from_slice(buf);
        cache.modified = true;
    }
}
