//! # 扩容
//!
//! 以 `blocks` 为游标，逐级把已分配的数据扇区数补到目标长度所需的数量：
//! 直接索引 → 一级索引 → 二级索引。每个新扇区都先清零再挂入索引。
//!
//! 游标随每个扇区推进，所以扩容可以反复调用，每次都从上次停下的地方继续；
//! 中途分配失败时，已挂入索引的扇区与索引块都会写回，下一次扩容或回收都能找到它们。

use log::{trace, warn};

use super::{
    DIRECT_COUNT, DiskInode, INDIRECT_COUNT, INDIRECT1_CAP, IndexBlock, MAX_FILE_SIZE, Plain,
    SectorRef,
};
use crate::{DataBlock, FsError, SECTOR_SIZE, SectorAllocator, SectorCache, SectorId, sectors_for};

const ZEROS: DataBlock = [0; SECTOR_SIZE];

impl DiskInode {
    /// 扩容至 `length` 字节并更新长度，返回达到的长度。
    ///
    /// 不会缩小：`length` 不大于当前长度时什么也不做。
    pub fn grow_to(
        &mut self,
        length: usize,
        cache: &dyn SectorCache,
        allocator: &dyn SectorAllocator,
    ) -> Result<usize, FsError> {
        if length > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }
        if length <= self.length as usize {
            return Ok(self.length as usize);
        }

        let wanted = sectors_for(length);
        if wanted > self.blocks as usize {
            trace!("grow: blocks {} -> {wanted}", self.blocks);
            self.grow_direct(wanted, cache, allocator)?;
            self.grow_indirect1(wanted, cache, allocator)?;
            self.grow_indirect2(wanted, cache, allocator)?;
        }

        self.length = length as u32;
        Ok(length)
    }

    fn grow_direct(
        &mut self,
        wanted: usize,
        cache: &dyn SectorCache,
        allocator: &dyn SectorAllocator,
    ) -> Result<(), FsError> {
        while (self.blocks as usize) < wanted.min(DIRECT_COUNT) {
            self.direct[self.blocks as usize] = SectorRef::new(alloc_zeroed(cache, allocator)?);
            self.blocks += 1;
        }

        Ok(())
    }

    fn grow_indirect1(
        &mut self,
        wanted: usize,
        cache: &dyn SectorCache,
        allocator: &dyn SectorAllocator,
    ) -> Result<(), FsError> {
        if self.blocks as usize >= wanted.min(INDIRECT1_CAP) {
            return Ok(());
        }

        let (sector, mut indirect1) = load_or_alloc(&mut self.indirect1, cache, allocator)?;
        let filled = fill(
            &mut indirect1,
            &mut self.blocks,
            DIRECT_COUNT,
            wanted.min(INDIRECT1_CAP),
            cache,
            allocator,
        );
        // 填满与否都要写回
        indirect1.store(cache, sector);

        filled
    }

    fn grow_indirect2(
        &mut self,
        wanted: usize,
        cache: &dyn SectorCache,
        allocator: &dyn SectorAllocator,
    ) -> Result<(), FsError> {
        if self.blocks as usize >= wanted {
            return Ok(());
        }

        let (sector, mut indirect2) = load_or_alloc(&mut self.indirect2, cache, allocator)?;
        let filled = fill_indirect2(&mut indirect2, &mut self.blocks, wanted, cache, allocator);
        indirect2.store(cache, sector);

        filled
    }
}

/// 逐个一级索引块填充二级索引，每处理完一个一级索引块就写回
fn fill_indirect2(
    indirect2: &mut IndexBlock,
    blocks: &mut u32,
    wanted: usize,
    cache: &dyn SectorCache,
    allocator: &dyn SectorAllocator,
) -> Result<(), FsError> {
    while (*blocks as usize) < wanted {
        let outer = (*blocks as usize - INDIRECT1_CAP) / INDIRECT_COUNT;
        let base = INDIRECT1_CAP + outer * INDIRECT_COUNT;

        let mut slot = indirect2.get(outer);
        let (sector, mut indirect1) = load_or_alloc(&mut slot, cache, allocator)?;
        indirect2.set(outer, sector);

        let filled = fill(
            &mut indirect1,
            blocks,
            base,
            wanted.min(base + INDIRECT_COUNT),
            cache,
            allocator,
        );
        indirect1.store(cache, sector);
        filled?;
    }

    Ok(())
}

/// 向索引块填入新数据扇区，直到游标到达 `end`；`base` 是该索引块 0 号槽位对应的扇区序号
fn fill(
    index: &mut IndexBlock,
    blocks: &mut u32,
    base: usize,
    end: usize,
    cache: &dyn SectorCache,
    allocator: &dyn SectorAllocator,
) -> Result<(), FsError> {
    while (*blocks as usize) < end {
        index.set(*blocks as usize - base, alloc_zeroed(cache, allocator)?);
        *blocks += 1;
    }

    Ok(())
}

/// 槽位为空时分配新索引块（内容全空），否则读出已有的索引块
fn load_or_alloc(
    slot: &mut SectorRef,
    cache: &dyn SectorCache,
    allocator: &dyn SectorAllocator,
) -> Result<(SectorId, IndexBlock), FsError> {
    match slot.get() {
        Some(sector) => Ok((sector, IndexBlock::load(cache, sector))),
        None => {
            let sector = allocate(allocator)?;
            trace!("grow: new index block at {sector:?}");
            *slot = SectorRef::new(sector);
            Ok((sector, IndexBlock::empty()))
        }
    }
}

fn alloc_zeroed(
    cache: &dyn SectorCache,
    allocator: &dyn SectorAllocator,
) -> Result<SectorId, FsError> {
    let sector = allocate(allocator)?;
    cache.write(sector, &ZEROS);
    Ok(sector)
}

#[inline]
fn allocate(allocator: &dyn SectorAllocator) -> Result<SectorId, FsError> {
    allocator.allocate().ok_or_else(|| {
        warn!("grow: out of free sectors");
        FsError::NoSpace
    })
}
