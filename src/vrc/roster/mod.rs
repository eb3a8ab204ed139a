//! 好友列表视图：过滤、排序、选中

pub mod options;
pub mod pipeline;
pub mod selection;

pub use options::{FilterSortOptions, InactivityFilter, SortMode, TimeUnit};
pub use pipeline::compute_displayed_roster;
pub use selection::Selection;
