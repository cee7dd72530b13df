//! # 磁盘数据结构层
//!
//! 卷的布局：
//! 超级块 | 空闲扇区位图 | 数据区
//!
//! inode 记录、索引块和文件数据都位于数据区，由位图统一分配。

use core::{mem, ptr, slice};

use crate::{SECTOR_SIZE, SectorCache, SectorId};

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod index;
pub use index::{
    DIRECT_COUNT, INDIRECT_COUNT, INDIRECT1_CAP, INDIRECT2_CAP, IndexBlock, MAX_FILE_SIZE, SectorRef,
    Tier,
};

mod inode;
pub use inode::{DiskInode, DiskInodeKind};

mod grow;
mod reclaim;

/// 可以与扇区字节直接互相转换的磁盘数据结构
///
/// # Safety
///
/// 实现者必须是 `#[repr(C)]`、没有填充字节，且任意字节序列都是它的合法值。
pub unsafe trait Plain: Sized {
    #[inline]
    fn zeroed() -> Self {
        // SAFETY: 全零也是合法值
        unsafe { mem::zeroed() }
    }

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), mem::size_of::<Self>()) }
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), mem::size_of::<Self>()) }
    }

    /// 从扇区读出，要求 `Self` 恰好占满一个扇区
    fn load(cache: &dyn SectorCache, sector: SectorId) -> Self {
        debug_assert_eq!(mem::size_of::<Self>(), SECTOR_SIZE);
        let mut value = Self::zeroed();
        cache.read(sector, value.as_bytes_mut());
        value
    }

    fn store(&self, cache: &dyn SectorCache, sector: SectorId) {
        debug_assert_eq!(mem::size_of::<Self>(), SECTOR_SIZE);
        cache.write(sector, self.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use core::mem;

    use super::bitmap::BitmapBlock;
    use super::{DiskInode, IndexBlock, SuperBlock};
    use crate::SECTOR_SIZE;

    #[test]
    fn layout() {
        assert_eq!(SECTOR_SIZE, mem::size_of::<DiskInode>());
        assert_eq!(SECTOR_SIZE, mem::size_of::<IndexBlock>());
        assert_eq!(SECTOR_SIZE, mem::size_of::<SuperBlock>());
        assert_eq!(SECTOR_SIZE, mem::size_of::<BitmapBlock>());
    }
}
