//! # 内存 inode 与读写路径
//!
//! 每个正被打开的扇区在内存中只对应一个 [`Inode`]，由 [`InodeTable`](crate::InodeTable)
//! 负责创建、计数与销毁。读写按扇区切块进行：整扇区对齐的块直接在缓存与调用方
//! 缓冲区之间传输，其余经由一个扇区大小的中转缓冲区。

use alloc::boxed::Box;
use alloc::sync::Arc;

use log::debug;
use spin::{Mutex, RwLock};

use crate::layout::{DiskInode, DiskInodeKind, Plain};
use crate::{
    DataBlock, FsError, MAX_FILE_SIZE, SECTOR_SIZE, SectorAllocator, SectorCache, SectorId,
};

pub struct Inode {
    /// inode 记录所在扇区，即文件的标识
    sector: SectorId,
    is_dir: bool,
    state: Mutex<InodeState>,
    /// 磁盘记录的内存副本
    record: RwLock<DiskInode>,
    /// 串行化同一 inode 上的扩容写
    growth: Mutex<()>,
    cache: Arc<dyn SectorCache>,
    allocator: Arc<dyn SectorAllocator>,
}

#[derive(Debug)]
pub(crate) struct InodeState {
    pub(crate) open_count: usize,
    pub(crate) removed: bool,
    deny_write_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeStat {
    pub sector: SectorId,
    pub kind: DiskInodeKind,
    pub length: usize,
    /// 数据扇区数
    pub data_sectors: usize,
    /// 数据扇区连同索引块
    pub total_sectors: usize,
}

impl Inode {
    pub(crate) fn new(
        sector: SectorId,
        record: DiskInode,
        cache: Arc<dyn SectorCache>,
        allocator: Arc<dyn SectorAllocator>,
    ) -> Self {
        Self {
            sector,
            is_dir: record.is_dir(),
            state: Mutex::new(InodeState {
                open_count: 1,
                removed: false,
                deny_write_count: 0,
            }),
            record: RwLock::new(record),
            growth: Mutex::new(()),
            cache,
            allocator,
        }
    }

    #[inline]
    pub fn sector(&self) -> SectorId {
        self.sector
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.record.read().length as usize
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    #[inline]
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// 标记删除，待最后一个打开者关闭时才真正回收
    pub fn remove(&self) {
        debug!("inode {:?}: marked removed", self.sector);
        self.state.lock().removed = true;
    }

    /// 禁止写入；每个打开者至多调用一次
    pub fn deny_write(&self) {
        let mut state = self.state.lock();
        state.deny_write_count += 1;
        assert!(
            state.deny_write_count <= state.open_count,
            "more write denials than openers"
        );
    }

    /// 恢复写入；必须与先前的 [`Self::deny_write`] 配对
    pub fn allow_write(&self) {
        let mut state = self.state.lock();
        assert!(state.deny_write_count > 0, "allow_write without deny_write");
        assert!(state.deny_write_count <= state.open_count);
        state.deny_write_count -= 1;
    }

    pub fn stat(&self) -> InodeStat {
        let record = self.record.read();
        InodeStat {
            sector: self.sector,
            kind: record.kind(),
            length: record.length as usize,
            data_sectors: record.blocks as usize,
            total_sectors: record.owned_sectors(&*self.cache),
        }
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`，返回读到的字节数；
    /// 遇到文件末尾时会少于 `buf.len()`。
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let mut bounce: Option<Box<DataBlock>> = None;
        let mut read_size = 0;

        while read_size < buf.len() {
            let offset = offset + read_size;
            let Some((sector, chunk)) = self.chunk(offset, buf.len() - read_size) else {
                break;
            };
            let sector_ofs = offset % SECTOR_SIZE;
            let dest = &mut buf[read_size..read_size + chunk];

            if sector_ofs == 0 && chunk == SECTOR_SIZE {
                // 整扇区直接读入调用方的缓冲区
                self.cache.read(sector, dest);
            } else {
                let bounce = bounce.get_or_insert_with(|| Box::new([0; SECTOR_SIZE]));
                self.cache.read(sector, &mut bounce[..]);
                dest.copy_from_slice(&bounce[sector_ofs..sector_ofs + chunk]);
            }

            read_size += chunk;
        }

        read_size
    }

    /// 从指定位置写入`buf`，必要时先扩容，返回写入的字节数。
    ///
    /// 禁止写入期间直接返回 0。
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        if self.state.lock().deny_write_count > 0 || buf.is_empty() {
            return Ok(0);
        }

        let end = offset
            .checked_add(buf.len())
            .filter(|&end| end <= MAX_FILE_SIZE)
            .ok_or(FsError::FileTooLarge)?;
        if end > self.length() {
            self.extend_to(end)?;
        }

        let mut bounce: Option<Box<DataBlock>> = None;
        let mut written_size = 0;

        while written_size < buf.len() {
            let offset = offset + written_size;
            let Some((sector, chunk)) = self.chunk(offset, buf.len() - written_size) else {
                break;
            };
            let sector_ofs = offset % SECTOR_SIZE;
            let src = &buf[written_size..written_size + chunk];

            if sector_ofs == 0 && chunk == SECTOR_SIZE {
                // 整扇区直接写入
                self.cache.write(sector, src);
            } else {
                // 部分扇区先读后写
                let bounce = bounce.get_or_insert_with(|| Box::new([0; SECTOR_SIZE]));
                self.cache.read(sector, &mut bounce[..]);
                bounce[sector_ofs..sector_ofs + chunk].copy_from_slice(src);
                self.cache.write(sector, &bounce[..]);
            }

            written_size += chunk;
        }

        Ok(written_size)
    }
}

impl Inode {
    /// `offset` 所在扇区，以及此处最多能传输多少字节
    fn chunk(&self, offset: usize, wanted: usize) -> Option<(SectorId, usize)> {
        let record = self.record.read();
        let sector = record.sector_of(offset, &*self.cache)?;

        let inode_left = record.length as usize - offset;
        let sector_left = SECTOR_SIZE - offset % SECTOR_SIZE;
        Some((sector, wanted.min(inode_left).min(sector_left)))
    }

    /// 扩容至 `end` 并把记录写回。
    ///
    /// 目录的串行化由上层负责，不经过扩容锁。
    fn extend_to(&self, end: usize) -> Result<(), FsError> {
        let _growth = (!self.is_dir).then(|| self.growth.lock());
        let mut record = self.record.write();

        // 等锁期间可能已被别人扩容
        if end <= record.length as usize {
            return Ok(());
        }

        let grown = record.grow_to(end, &*self.cache, &*self.allocator);
        // 失败时游标与索引也已推进，照样写回
        record.store(&*self.cache, self.sector);
        debug!(
            "inode {:?}: grow to {end} bytes, {} data sectors",
            self.sector, record.blocks
        );

        grown.map(|_| ())
    }

    pub(crate) fn state(&self) -> spin::MutexGuard<'_, InodeState> {
        self.state.lock()
    }

    /// 最后一个打开者关闭时调用：回收或写回
    pub(crate) fn finalize(&self, removed: bool) {
        let mut record = self.record.write();
        if removed {
            let released = record.reclaim(&*self.cache, &*self.allocator);
            self.allocator.release(self.sector);
            debug!(
                "inode {:?}: reclaimed {} sectors",
                self.sector,
                released + 1
            );
        } else {
            record.store(&*self.cache, self.sector);
        }
    }
}
