use crate::SectorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 空闲扇区耗尽
    NoSpace,
    /// 超出三级索引所能编号的最大文件长度
    FileTooLarge,
    /// 该扇区上不是 inode 记录
    NotAnInode(SectorId),
    /// 超级块校验失败
    InvalidVolume,
    /// 设备容不下超级块、位图与至少一个数据扇区
    VolumeTooSmall,
}
