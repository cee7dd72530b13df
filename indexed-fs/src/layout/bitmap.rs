use super::Plain;
use crate::{SECTOR_BITS, SectorCache, SectorId};

/// 位图区域内扇区的结构
pub type BitmapBlock = [u64; SECTOR_BITS / 64];

unsafe impl Plain for BitmapBlock {}

/// 位图区域，记录数据区的扇区分配情况
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始扇区
    start_sector: u32,
    /// 位图占用扇区数
    sectors: usize,
    /// 位图所指示区域的总扇区数，不超过 `sectors * SECTOR_BITS`
    capacity: usize,
}

/// 位在位图内的编号
struct BitId(usize);

impl Bitmap {
    #[inline]
    pub fn new(start_sector: u32, sectors: usize, capacity: usize) -> Self {
        debug_assert!(capacity <= sectors * SECTOR_BITS);
        Self {
            start_sector,
            sectors,
            capacity,
        }
    }

    #[inline]
    pub fn sectors(&self) -> usize {
        self.sectors
    }

    /// 全部位清零
    pub fn clear(&self, cache: &dyn SectorCache) {
        let empty: BitmapBlock = [0; SECTOR_BITS / 64];
        for block_index in 0..self.sectors {
            empty.store(cache, self.sector(block_index));
        }
    }

    /// 在指示区域内分配新的扇区，返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&self, cache: &dyn SectorCache) -> Option<usize> {
        // 遍历位图区域内所有的扇区，寻找还有 0 的位组
        for block_index in 0..self.sectors {
            let sector = self.sector(block_index);
            let mut bitmap_block = BitmapBlock::load(cache, sector);

            let Some((group_index, ingroup_index)) =
                bitmap_block
                    .iter()
                    .enumerate()
                    .find_map(|(group_index, &bits)| {
                        (bits != u64::MAX).then_some((group_index, bits.trailing_ones()))
                    })
            else {
                continue;
            };

            let id = BitId::encode(block_index, group_index, ingroup_index as usize);
            // 编号只会越找越大，超出容量即说明已用尽
            if id.0 >= self.capacity {
                return None;
            }

            bitmap_block[group_index] |= 1 << ingroup_index;
            bitmap_block.store(cache, sector);
            return Some(id.0);
        }

        None
    }

    pub fn dealloc(&self, cache: &dyn SectorCache, id: usize) {
        assert!(id < self.capacity, "bit {id} out of bitmap");
        let (block_index, group_index, ingroup_index) = BitId(id).decode();
        let sector = self.sector(block_index);
        let mut bitmap_block = BitmapBlock::load(cache, sector);

        // 编号一定得有对应的位
        assert_ne!(
            bitmap_block[group_index] & (1 << ingroup_index),
            0,
            "bit {id} released twice"
        );

        bitmap_block[group_index] -= 1 << ingroup_index;
        bitmap_block.store(cache, sector);
    }

    /// 尚未分配的位数
    pub fn count_free(&self, cache: &dyn SectorCache) -> usize {
        let used: usize = (0..self.sectors)
            .map(|block_index| {
                BitmapBlock::load(cache, self.sector(block_index))
                    .iter()
                    .map(|bits| bits.count_ones() as usize)
                    .sum::<usize>()
            })
            .sum();

        self.capacity - used
    }

    #[inline]
    fn sector(&self, block_index: usize) -> SectorId {
        SectorId::new(self.start_sector + block_index as u32)
    }
}

impl BitId {
    /// 线性映射编码得到位编号
    #[inline]
    fn encode(block_index: usize, group_index: usize, ingroup_index: usize) -> Self {
        Self(block_index * SECTOR_BITS + group_index * 64 + ingroup_index)
    }

    fn decode(self) -> (usize, usize, usize) {
        let mut id = self.0;

        let block_index = id / SECTOR_BITS;
        id %= SECTOR_BITS;
        (block_index, id / 64, id % 64)
    }
}
