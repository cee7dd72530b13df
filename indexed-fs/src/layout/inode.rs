use static_assertions::const_assert_eq;

use super::{DIRECT_COUNT, INDIRECT1_CAP, INDIRECT_COUNT, IndexBlock, Plain, SectorRef, Tier};
use crate::{INODE_MAGIC, SECTOR_SIZE, SectorCache, SectorId};

/// 磁盘上的 inode 记录，恰好占满一个扇区，所在扇区号即文件的标识
#[repr(C)]
pub struct DiskInode {
    /// 文件长度（字节）
    pub length: u32,
    magic: u32,
    _unused: [u32; 110],
    /// 直接索引，存储容量：DIRECT_COUNT * SECTOR_SIZE 字节
    pub(super) direct: [SectorRef; DIRECT_COUNT],
    /// 指向一个一级索引块
    pub(super) indirect1: SectorRef,
    /// 指向一个二级索引块
    pub(super) indirect2: SectorRef,
    /// 已分配的数据扇区数，扩容从这里继续
    pub blocks: u32,
    /// 类型，见 [`DiskInodeKind`]
    kind: u32,
}

const_assert_eq!(core::mem::size_of::<DiskInode>(), SECTOR_SIZE);

unsafe impl Plain for DiskInode {}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[repr(u32)]
pub enum DiskInodeKind {
    #[default]
    File = 0,
    Directory = 1,
}

impl DiskInode {
    pub fn new(kind: DiskInodeKind) -> Self {
        Self {
            length: 0,
            magic: INODE_MAGIC,
            _unused: [0; 110],
            direct: [SectorRef::EMPTY; DIRECT_COUNT],
            indirect1: SectorRef::EMPTY,
            indirect2: SectorRef::EMPTY,
            blocks: 0,
            kind: kind as u32,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == INODE_MAGIC
    }

    #[inline]
    pub fn kind(&self) -> DiskInodeKind {
        if self.kind == DiskInodeKind::Directory as u32 {
            DiskInodeKind::Directory
        } else {
            DiskInodeKind::File
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == DiskInodeKind::Directory
    }

    /// 返回文件内字节偏移 `offset` 所在的数据扇区；
    /// 偏移不小于文件长度时返回空。
    pub fn sector_of(&self, offset: usize, cache: &dyn SectorCache) -> Option<SectorId> {
        if offset >= self.length as usize {
            return None;
        }

        match Tier::locate(offset / SECTOR_SIZE)? {
            Tier::Direct(index) => self.direct[index].get(),
            Tier::Indirect1(index) => IndexBlock::load(cache, self.indirect1.get()?)
                .get(index)
                .get(),
            Tier::Indirect2(outer, inner) => {
                let indirect1 = IndexBlock::load(cache, self.indirect2.get()?)
                    .get(outer)
                    .get()?;
                IndexBlock::load(cache, indirect1).get(inner).get()
            }
        }
    }

    /// 记录实际占有的扇区数：数据扇区加上现存的索引块。
    ///
    /// 扩容中途失败时，索引块可能已分配而其下还没有数据扇区。
    pub fn owned_sectors(&self, cache: &dyn SectorCache) -> usize {
        let mut total = self.blocks as usize;

        if self.indirect1.get().is_some() {
            total += 1;
        }

        if let Some(sector) = self.indirect2.get() {
            total += 1 + IndexBlock::load(cache, sector).live(INDIRECT_COUNT).count();
        }

        total
    }

    /// 记录中 `blocks` 个数据扇区连同所需索引块一共占用多少扇区
    pub fn count_total_sectors(blocks: usize) -> usize {
        let mut total = blocks;

        // 超出直接索引，使用一级索引块
        if blocks > DIRECT_COUNT {
            total += 1;
        }

        // 超出一级索引，使用二级索引块及其下的一级索引块
        if blocks > INDIRECT1_CAP {
            total += 1 + (blocks - INDIRECT1_CAP).div_ceil(INDIRECT_COUNT);
        }

        total
    }
}
