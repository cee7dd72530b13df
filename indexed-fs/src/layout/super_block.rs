use static_assertions::const_assert_eq;

use super::Plain;
use crate::{MAGIC, SECTOR_SIZE};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位位图与数据区；
/// - 记录根目录 inode 所在扇区
#[derive(Debug)]
#[repr(C)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u32,
    /// 文件系统占据扇区数
    pub total_sectors: u32,
    pub bitmap_sectors: u32,
    pub data_sectors: u32,
    /// 根目录 inode 所在扇区
    pub root: u32,
    _reserved: [u32; 123],
}

const_assert_eq!(core::mem::size_of::<SuperBlock>(), SECTOR_SIZE);

unsafe impl Plain for SuperBlock {}

impl SuperBlock {
    #[inline]
    pub fn new(total_sectors: u32, bitmap_sectors: u32, data_sectors: u32, root: u32) -> Self {
        Self {
            magic: MAGIC,
            total_sectors,
            bitmap_sectors,
            data_sectors,
            root,
            _reserved: [0; 123],
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }
}
