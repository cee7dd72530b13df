#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* indexed-fs 的整体架构，自上而下 */

// 卷：格式化、挂载与卸载
mod fs;

// 打开 inode 表：同一扇区只对应一个内存 inode
mod table;

// 内存 inode 与读写路径
mod inode;

// 磁盘数据结构层：inode 记录、索引块、超级块与位图
mod layout;

// 空闲扇区分配
mod free_map;

// 扇区抽象与扇区缓存层
mod sector;

mod error;

pub use self::{
    error::FsError,
    free_map::{FreeMap, SectorAllocator},
    fs::IndexedFileSystem,
    inode::{Inode, InodeStat},
    layout::{
        DIRECT_COUNT, DiskInode, DiskInodeKind, INDIRECT_COUNT, INDIRECT1_CAP, INDIRECT2_CAP,
        IndexBlock, MAX_FILE_SIZE, Plain, SectorRef, Tier,
    },
    sector::{BlockCache, SectorCache, SectorId},
    table::InodeTable,
};

/// 扇区大小；容量常量均由它推出
pub const SECTOR_SIZE: usize = 512;
/// 超级块魔数
pub const MAGIC: u32 = 0x3b800001;
/// inode 记录魔数
pub const INODE_MAGIC: u32 = 0x494e4f44;
pub const SECTOR_BITS: usize = SECTOR_SIZE * 8;

type DataBlock = [u8; SECTOR_SIZE];

/// 容纳 `size` 字节需要多少个数据扇区
#[inline]
pub fn sectors_for(size: usize) -> usize {
    size.div_ceil(SECTOR_SIZE)
}
