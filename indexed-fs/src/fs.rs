//! # 卷
//!
//! 构建出磁盘的布局并使用：挂载时建立扇区缓存、空闲扇区位图与打开 inode 表，
//! 卸载时要求所有 inode 都已关闭。

use alloc::sync::Arc;

use block_dev::BlockDevice;
use log::info;

use crate::layout::{Bitmap, Plain, SuperBlock};
use crate::{
    BlockCache, FreeMap, FsError, InodeTable, SECTOR_BITS, SectorAllocator, SectorId,
};

const SUPER_BLOCK: SectorId = SectorId::new(0);

pub struct IndexedFileSystem {
    cache: Arc<BlockCache>,
    free_map: Arc<FreeMap>,
    inodes: InodeTable,
    /// 根目录 inode 所在扇区
    root: SectorId,
}

impl IndexedFileSystem {
    /// 在整个设备上格式化出新卷，并创建空的根目录
    pub fn format(dev: Arc<dyn BlockDevice>) -> Result<Self, FsError> {
        let total_sectors = dev.num_blocks().min(u32::MAX as usize);
        let data_total_sectors = total_sectors
            .checked_sub(1)
            .ok_or(FsError::VolumeTooSmall)?;
        let bitmap_sectors = (data_total_sectors + SECTOR_BITS) / (SECTOR_BITS + 1);
        let data_sectors = data_total_sectors - bitmap_sectors;
        if data_sectors == 0 {
            return Err(FsError::VolumeTooSmall);
        }

        let cache = Arc::new(BlockCache::new(dev));
        let bitmap = Bitmap::new(1, bitmap_sectors, data_sectors);
        bitmap.clear(&*cache);

        let mut fs = Self::assemble(cache, bitmap, SUPER_BLOCK);
        fs.root = fs.create_inode(0, true)?;

        SuperBlock::new(
            total_sectors as u32,
            bitmap_sectors as u32,
            data_sectors as u32,
            fs.root.raw(),
        )
        .store(&*fs.cache, SUPER_BLOCK);
        fs.cache.sync_all();

        info!(
            "format: {total_sectors} sectors, {bitmap_sectors} bitmap sectors, root at {:?}",
            fs.root
        );
        Ok(fs)
    }

    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self, FsError> {
        let cache = Arc::new(BlockCache::new(dev));
        let super_block = SuperBlock::load(&*cache, SUPER_BLOCK);
        if !super_block.is_valid() {
            return Err(FsError::InvalidVolume);
        }

        let bitmap = Bitmap::new(
            1,
            super_block.bitmap_sectors as usize,
            super_block.data_sectors as usize,
        );
        let fs = Self::assemble(cache, bitmap, SectorId::new(super_block.root));

        info!(
            "mount: {} sectors, {} free",
            super_block.total_sectors,
            fs.free_sectors()
        );
        Ok(fs)
    }

    #[inline]
    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    #[inline]
    pub fn root(&self) -> SectorId {
        self.root
    }

    /// 分配一个扇区存放新 inode 的记录，并扩容到 `length` 字节
    pub fn create_inode(&self, length: usize, is_dir: bool) -> Result<SectorId, FsError> {
        let sector = self.free_map.allocate().ok_or(FsError::NoSpace)?;
        if let Err(e) = self.inodes.create(sector, length, is_dir) {
            self.free_map.release(sector);
            return Err(e);
        }

        Ok(sector)
    }

    /// 数据区中尚未分配的扇区数
    #[inline]
    pub fn free_sectors(&self) -> usize {
        self.free_map.free_count()
    }

    #[inline]
    pub fn sync(&self) {
        self.cache.sync_all();
    }

    pub fn unmount(self) {
        assert!(
            self.inodes.is_empty(),
            "unmount with {} inodes still open",
            self.inodes.len()
        );
        self.cache.sync_all();
        info!("unmount: {} free sectors", self.free_sectors());
    }
}

impl IndexedFileSystem {
    fn assemble(cache: Arc<BlockCache>, bitmap: Bitmap, root: SectorId) -> Self {
        let data_start = 1 + bitmap.sectors() as u32;
        let free_map = Arc::new(FreeMap::new(bitmap, data_start, cache.clone()));
        let inodes = InodeTable::new(cache.clone(), free_map.clone());

        Self {
            cache,
            free_map,
            inodes,
            root,
        }
    }
}
