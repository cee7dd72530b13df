//! 索引块
//! - 直接索引：inode 记录内的 12 个扇区号，每个都指向一个**数据扇区**
//! - 一级索引：整个扇区连续存储**扇区号**，每个编号都指向一个**数据扇区**
//! - 二级索引：整个扇区连续存储**扇区号**，每个编号都指向一个一级索引块
//!
//! ## 扇区索引编码
//!
//! - 二级索引内的序号除以一级索引块的**可编号数量**，可得一级索引块的位置
//! - 二级索引内的序号模一级索引块的**可编号数量**，可得该块内部的位置

use static_assertions::const_assert_eq;

use super::Plain;
use crate::{SECTOR_SIZE, SectorId};

/// 直接索引可编号数量
pub const DIRECT_COUNT: usize = 12;
/// 索引块的编号容量
pub const INDIRECT_COUNT: usize = SECTOR_SIZE / 4;
/// 用上一级索引时的编号容量
pub const INDIRECT1_CAP: usize = DIRECT_COUNT + INDIRECT_COUNT;
/// 用上二级索引时的编号容量
pub const INDIRECT2_CAP: usize = INDIRECT1_CAP + INDIRECT_COUNT.pow(2);
/// 文件长度上限（字节）
pub const MAX_FILE_SIZE: usize = INDIRECT2_CAP * SECTOR_SIZE;

const_assert_eq!(INDIRECT1_CAP, 140);
const_assert_eq!(INDIRECT2_CAP, 16524);

/// 磁盘上的扇区指针槽位，0 表示空
///
/// 0 号扇区永远是超级块，不会被分配出去。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SectorRef(u32);

impl SectorRef {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn new(sector: SectorId) -> Self {
        debug_assert_ne!(sector.raw(), 0, "sector 0 can't be referenced");
        Self(sector.raw())
    }

    #[inline]
    pub fn get(self) -> Option<SectorId> {
        (self.0 != 0).then_some(SectorId::new(self.0))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// 数据扇区序号落在哪一级索引，以及在该级中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Direct(usize),
    Indirect1(usize),
    /// (一级索引块在二级索引块中的位置, 一级索引块内的位置)
    Indirect2(usize, usize),
}

impl Tier {
    /// 超出容量则返回空
    pub fn locate(index: usize) -> Option<Self> {
        if index < DIRECT_COUNT {
            Some(Self::Direct(index))
        } else if index < INDIRECT1_CAP {
            Some(Self::Indirect1(index - DIRECT_COUNT))
        } else if index < INDIRECT2_CAP {
            let index = index - INDIRECT1_CAP;
            Some(Self::Indirect2(
                index / INDIRECT_COUNT,
                index % INDIRECT_COUNT,
            ))
        } else {
            None
        }
    }
}

/// 索引块：一个扇区的扇区号数组
#[derive(Debug, Clone)]
#[repr(C)]
pub struct IndexBlock([SectorRef; INDIRECT_COUNT]);

unsafe impl Plain for IndexBlock {}

impl IndexBlock {
    #[inline]
    pub fn empty() -> Self {
        Self([SectorRef::EMPTY; INDIRECT_COUNT])
    }

    #[inline]
    pub fn get(&self, index: usize) -> SectorRef {
        self.0[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, sector: SectorId) {
        self.0[index] = SectorRef::new(sector);
    }

    /// 前 `count` 个槽位中的扇区
    pub fn live(&self, count: usize) -> impl Iterator<Item = SectorId> + '_ {
        self.0[..count.min(INDIRECT_COUNT)]
            .iter()
            .filter_map(|slot| slot.get())
    }
}
