//! 过滤 / 排序选项

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// 不活跃阈值的时间单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Days,
    #[default]
    Months,
    Years,
}

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// 按最后上线时间升序，从未上线的排最前
    #[default]
    OldestFirst,
    /// 按最后上线时间降序，从未上线的排最后
    NewestFirst,
    NameAscending,
    NameDescending,
}

/// 不活跃过滤：只保留在 `now - threshold_count·unit` 之前最后上线（或从未上线）的好友
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityFilter {
    /// 非正数表示过滤不生效
    pub threshold_count: i64,
    pub unit: TimeUnit,
}

impl InactivityFilter {
    pub fn new(threshold_count: i64, unit: TimeUnit) -> Self {
        Self {
            threshold_count,
            unit,
        }
    }

    /// 从用户输入解析；无法解析时阈值记为 0（不生效）而不是报错
    pub fn from_input(input: &str, unit: TimeUnit) -> Self {
        let threshold_count = input.trim().parse::<i64>().unwrap_or(0);
        Self::new(threshold_count, unit)
    }

    /// 截止时间；阈值非正或计算溢出时返回 None
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.threshold_count <= 0 {
            return None;
        }
        match self.unit {
            TimeUnit::Days => Duration::try_days(self.threshold_count)
                .and_then(|d| now.checked_sub_signed(d)),
            TimeUnit::Months => u32::try_from(self.threshold_count)
                .ok()
                .and_then(|n| now.checked_sub_months(Months::new(n))),
            TimeUnit::Years => u32::try_from(self.threshold_count)
                .ok()
                .and_then(|n| n.checked_mul(12))
                .and_then(|n| now.checked_sub_months(Months::new(n))),
        }
    }
}

/// 用户可配置的视图参数
///
/// 收藏的好友默认不出现在展示列表中，也就不会被批量操作选中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSortOptions {
    #[serde(default = "default_exclude_favorites")]
    pub exclude_favorites: bool,
    #[serde(default)]
    pub inactivity_filter: Option<InactivityFilter>,
    #[serde(default)]
    pub sort_mode: SortMode,
}

fn default_exclude_favorites() -> bool {
    true
}

impl Default for FilterSortOptions {
    fn default() -> Self {
        Self {
            exclude_favorites: default_exclude_favorites(),
            inactivity_filter: None,
            sort_mode: SortMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_first_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn cutoff_per_unit() {
        let now = jan_first_2025();
        assert_eq!(
            InactivityFilter::new(10, TimeUnit::Days).cutoff(now),
            Some(Utc.with_ymd_and_hms(2024, 12, 22, 0, 0, 0).unwrap())
        );
        assert_eq!(
            InactivityFilter::new(3, TimeUnit::Months).cutoff(now),
            Some(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            InactivityFilter::new(2, TimeUnit::Years).cutoff(now),
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn non_positive_or_garbage_threshold_disables_filter() {
        let now = jan_first_2025();
        assert_eq!(InactivityFilter::new(0, TimeUnit::Days).cutoff(now), None);
        assert_eq!(InactivityFilter::new(-4, TimeUnit::Months).cutoff(now), None);
        let parsed = InactivityFilter::from_input("three", TimeUnit::Years);
        assert_eq!(parsed.threshold_count, 0);
        assert_eq!(parsed.cutoff(now), None);
        assert_eq!(InactivityFilter::from_input(" 6 ", TimeUnit::Days).threshold_count, 6);
    }

    #[test]
    fn absurd_threshold_does_not_panic() {
        let now = jan_first_2025();
        assert_eq!(InactivityFilter::new(i64::MAX, TimeUnit::Days).cutoff(now), None);
        assert_eq!(InactivityFilter::new(i64::MAX, TimeUnit::Years).cutoff(now), None);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: FilterSortOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, FilterSortOptions::default());
        assert!(opts.exclude_favorites);

        let opts: FilterSortOptions =
            serde_json::from_str(r#"{"exclude_favorites":false}"#).unwrap();
        assert!(!opts.exclude_favorites);
        let opts: FilterSortOptions = serde_json::from_str(
            r#"{"exclude_favorites":true,"inactivity_filter":{"threshold_count":3,"unit":"years"},"sort_mode":"name_descending"}"#,
        )
        .unwrap();
        assert!(opts.exclude_favorites);
        assert_eq!(opts.sort_mode, SortMode::NameDescending);
        assert_eq!(opts.inactivity_filter.unwrap().unit, TimeUnit::Years);
    }
}
