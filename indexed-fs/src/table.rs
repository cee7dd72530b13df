//! # 打开 inode 表
//!
//! 扇区号到内存 inode 的映射，保证同一扇区同时至多有一个 [`Inode`]：
//! 两次打开同一文件得到的是同一个句柄，共享引用计数。
//! 查找、插入、移除与计数的增减都在表锁内完成。

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use log::debug;
use spin::Mutex;

use crate::layout::{DiskInode, DiskInodeKind, Plain};
use crate::{FsError, Inode, SectorAllocator, SectorCache, SectorId};

pub struct InodeTable {
    inodes: Mutex<BTreeMap<SectorId, Arc<Inode>>>,
    cache: Arc<dyn SectorCache>,
    allocator: Arc<dyn SectorAllocator>,
}

impl InodeTable {
    pub fn new(cache: Arc<dyn SectorCache>, allocator: Arc<dyn SectorAllocator>) -> Self {
        Self {
            inodes: Mutex::new(BTreeMap::new()),
            cache,
            allocator,
        }
    }

    /// 在 `sector` 上写入新的 inode 记录，并立即扩容到 `length` 字节。
    ///
    /// 扩容失败时，已分配的扇区会被归还，记录不会写入。
    pub fn create(&self, sector: SectorId, length: usize, is_dir: bool) -> Result<(), FsError> {
        debug_assert!(
            !self.inodes.lock().contains_key(&sector),
            "{sector:?} is open"
        );

        let kind = if is_dir {
            DiskInodeKind::Directory
        } else {
            DiskInodeKind::File
        };
        let mut record = DiskInode::new(kind);
        if let Err(e) = record.grow_to(length, &*self.cache, &*self.allocator) {
            record.reclaim(&*self.cache, &*self.allocator);
            return Err(e);
        }

        record.store(&*self.cache, sector);
        debug!("inode {sector:?}: created, {length} bytes, {kind:?}");
        Ok(())
    }

    pub fn open(&self, sector: SectorId) -> Result<Arc<Inode>, FsError> {
        let mut inodes = self.inodes.lock();

        // 已打开则共用
        if let Some(inode) = inodes.get(&sector) {
            inode.state().open_count += 1;
            return Ok(inode.clone());
        }

        let record = DiskInode::load(&*self.cache, sector);
        if !record.is_valid() {
            return Err(FsError::NotAnInode(sector));
        }

        let inode = Arc::new(Inode::new(
            sector,
            record,
            self.cache.clone(),
            self.allocator.clone(),
        ));
        inodes.insert(sector, inode.clone());
        debug!("inode {sector:?}: opened");

        Ok(inode)
    }

    pub fn reopen(&self, inode: &Arc<Inode>) -> Arc<Inode> {
        let _inodes = self.inodes.lock();
        inode.state().open_count += 1;
        inode.clone()
    }

    /// 关闭 `inode`；最后一个打开者关闭时从表中移除，
    /// 已标记删除的回收全部扇区，否则把记录写回磁盘。
    pub fn close(&self, inode: Arc<Inode>) {
        let mut inodes = self.inodes.lock();

        let removed = {
            let mut state = inode.state();
            assert!(state.open_count > 0, "{:?} is not open", inode.sector());
            state.open_count -= 1;
            if state.open_count > 0 {
                return;
            }
            state.removed
        };

        inodes.remove(&inode.sector());
        // 写回与回收仍在表锁内，以免并发的 open 读到旧记录
        inode.finalize(removed);
        debug!("inode {:?}: closed", inode.sector());
    }

    /// 正被打开的 inode 个数
    #[inline]
    pub fn len(&self) -> usize {
        self.inodes.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inodes.lock().is_empty()
    }
}
