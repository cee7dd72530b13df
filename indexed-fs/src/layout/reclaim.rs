use log::debug;

use super::{DIRECT_COUNT, DiskInode, INDIRECT_COUNT, INDIRECT1_CAP, IndexBlock, Plain, SectorRef};
use crate::{SectorAllocator, SectorCache, SectorId};

impl DiskInode {
    /// 把 inode 占有的数据扇区与索引块全部还给分配器，返回释放的扇区数。
    ///
    /// 以 `blocks` 和现存的索引指针为准，扩容中途失败遗留的索引块也会一并释放。
    /// 之后记录回到空文件的状态。
    pub fn reclaim(&mut self, cache: &dyn SectorCache, allocator: &dyn SectorAllocator) -> usize {
        let blocks = self.blocks as usize;
        let mut released = 0;
        let mut release = |sector: SectorId| {
            allocator.release(sector);
            released += 1;
        };

        /******************** 直接索引 ********************/
        self.direct[..blocks.min(DIRECT_COUNT)]
            .iter()
            .filter_map(|slot| slot.get())
            .for_each(&mut release);
        /******************** END ********************/

        /******************** 一级索引 ********************/
        if let Some(sector) = self.indirect1.get() {
            IndexBlock::load(cache, sector)
                .live(blocks.saturating_sub(DIRECT_COUNT))
                .for_each(&mut release);
            release(sector);
        }
        /******************** END ********************/

        /******************** 二级索引 ********************/
        if let Some(sector) = self.indirect2.get() {
            let indirect2 = IndexBlock::load(cache, sector);
            let mut remaining = blocks.saturating_sub(INDIRECT1_CAP);

            for outer in 0..INDIRECT_COUNT {
                // 一级索引块按序分配，遇到空槽位就说明后面都没有了
                let Some(indirect1) = indirect2.get(outer).get() else {
                    break;
                };
                IndexBlock::load(cache, indirect1)
                    .live(remaining)
                    .for_each(&mut release);
                remaining = remaining.saturating_sub(INDIRECT_COUNT);
                release(indirect1);
            }
            release(sector);
        }
        /******************** END ********************/

        self.length = 0;
        self.blocks = 0;
        self.direct = [SectorRef::EMPTY; DIRECT_COUNT];
        self.indirect1 = SectorRef::EMPTY;
        self.indirect2 = SectorRef::EMPTY;

        debug!("reclaim: released {released} sectors of {blocks} data blocks");
        released
    }
}
