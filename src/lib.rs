pub mod vrc;

// 重新导出常用类型和函数，方便外部使用
pub use vrc::{
    batch::{BatchHandle, BatchRunner, BatchSummary, DelayRange, JobState},
    client::{ClientConfig, VrcClient},
    friend::FriendRecord,
    roster::{compute_displayed_roster, FilterSortOptions, SortMode},
};
