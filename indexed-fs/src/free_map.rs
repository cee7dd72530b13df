//! # 空闲扇区分配
//!
//! inode 层只依赖 [`SectorAllocator`] 的单扇区分配与释放。
//! [`FreeMap`] 用位图记录数据区的占用情况，位图本身经由扇区缓存持久化。

use alloc::sync::Arc;

use log::trace;
use spin::Mutex;

use crate::layout::Bitmap;
use crate::{SectorCache, SectorId};

/// 空闲扇区分配器特质；单次调用自身须是原子的
pub trait SectorAllocator: Send + Sync {
    /// 分配一个扇区，耗尽时返回空
    fn allocate(&self) -> Option<SectorId>;
    /// 归还一个扇区；归还未分配的扇区属于调用方的错误
    fn release(&self, sector: SectorId);
}

pub struct FreeMap {
    bitmap: Mutex<Bitmap>,
    /// 数据区的起始扇区，对应位图的 0 号位
    data_start: u32,
    cache: Arc<dyn SectorCache>,
}

impl FreeMap {
    pub(crate) fn new(bitmap: Bitmap, data_start: u32, cache: Arc<dyn SectorCache>) -> Self {
        // 0 号扇区留给超级块，扇区指针借 0 表示空
        assert!(data_start > 0);
        Self {
            bitmap: Mutex::new(bitmap),
            data_start,
            cache,
        }
    }

    /// 数据区中尚未分配的扇区数
    pub fn free_count(&self) -> usize {
        self.bitmap.lock().count_free(&*self.cache)
    }
}

impl SectorAllocator for FreeMap {
    fn allocate(&self) -> Option<SectorId> {
        let bit = self.bitmap.lock().alloc(&*self.cache)?;
        let sector = SectorId::new(self.data_start + bit as u32);
        trace!("free map: allocate {sector:?}");
        Some(sector)
    }

    fn release(&self, sector: SectorId) {
        assert!(
            sector.raw() >= self.data_start,
            "{sector:?} is not in the data area"
        );
        trace!("free map: release {sector:?}");
        self.bitmap
            .lock()
            .dealloc(&*self.cache, (sector.raw() - self.data_start) as usize);
    }
}
