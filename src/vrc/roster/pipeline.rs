//! 好友列表过滤 / 排序
//!
//! 纯函数：输入全量好友、收藏集合、选项和当前时间，输出新分配的有序列表。

use crate::vrc::friend::models::FriendRecord;
use crate::vrc::roster::options::{FilterSortOptions, SortMode};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// 计算展示列表
///
/// - 排除收藏（可选）
/// - 不活跃过滤：从未上线或时间格式错误的记录总是保留
/// - 排序：按时间时缺失值视为最小；按名称时忽略大小写；相等时保持输入顺序
pub fn compute_displayed_roster(
    all_friends: &[FriendRecord],
    favorite_ids: &HashSet<String>,
    options: &FilterSortOptions,
    now: DateTime<Utc>,
) -> Vec<FriendRecord> {
    let cutoff = options.inactivity_filter.and_then(|f| f.cutoff(now));

    // 先解析时间，排序时不再重复解析
    let mut kept: Vec<(&FriendRecord, Option<DateTime<Utc>>)> = all_friends
        .iter()
        .filter(|f| !(options.exclude_favorites && favorite_ids.contains(&f.id)))
        .map(|f| (f, f.last_seen()))
        .filter(|(_, seen)| match (cutoff, seen) {
            (Some(cutoff), Some(seen)) => *seen < cutoff,
            _ => true,
        })
        .collect();

    // sort_by 是稳定排序
    match options.sort_mode {
        SortMode::OldestFirst => kept.sort_by(|a, b| a.1.cmp(&b.1)),
        SortMode::NewestFirst => kept.sort_by(|a, b| b.1.cmp(&a.1)),
        SortMode::NameAscending | SortMode::NameDescending => {
            let mut keyed: Vec<_> = kept
                .into_iter()
                .map(|entry| (entry.0.display_name.to_lowercase(), entry))
                .collect();
            if options.sort_mode == SortMode::NameAscending {
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
            } else {
                keyed.sort_by(|a, b| b.0.cmp(&a.0));
            }
            kept = keyed.into_iter().map(|(_, entry)| entry).collect();
        }
    }

    kept.into_iter().map(|(f, _)| f.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vrc::roster::options::{InactivityFilter, TimeUnit};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn ids(list: &[FriendRecord]) -> Vec<&str> {
        list.iter().map(|f| f.id.as_str()).collect()
    }

    fn names(list: &[FriendRecord]) -> Vec<&str> {
        list.iter().map(|f| f.display_name.as_str()).collect()
    }

    fn sample() -> Vec<FriendRecord> {
        vec![
            FriendRecord::new("usr_1", "Bob").with_last_login("2024-06-01T00:00:00Z"),
            FriendRecord::new("usr_2", "alice"),
            FriendRecord::new("usr_3", "Carol").with_last_login("2023-02-01T00:00:00Z"),
            FriendRecord::new("usr_4", "dave").with_last_login("not a date"),
            FriendRecord::new("usr_5", "Eve").with_last_login("2024-12-20T08:00:00.000Z"),
        ]
    }

    #[test]
    fn favorites_are_excluded_unless_included_explicitly() {
        let favs: HashSet<String> = ["usr_1".to_string(), "usr_5".to_string()].into();
        let mut opts = FilterSortOptions {
            sort_mode: SortMode::NameAscending,
            ..Default::default()
        };
        let out = compute_displayed_roster(&sample(), &favs, &opts, now());
        assert!(out.iter().all(|f| !favs.contains(&f.id)));
        assert_eq!(ids(&out), vec!["usr_2", "usr_3", "usr_4"]);

        opts.exclude_favorites = false;
        assert_eq!(compute_displayed_roster(&sample(), &favs, &opts, now()).len(), 5);
    }

    #[test]
    fn inactivity_filter_three_months() {
        let friends = vec![
            FriendRecord::new("old", "Old").with_last_login("2024-01-01T00:00:00Z"),
            FriendRecord::new("recent", "Recent").with_last_login("2024-12-01T00:00:00Z"),
            FriendRecord::new("never", "Never"),
        ];
        let opts = FilterSortOptions {
            inactivity_filter: Some(InactivityFilter::new(3, TimeUnit::Months)),
            ..Default::default()
        };
        let out = compute_displayed_roster(&friends, &HashSet::new(), &opts, now());
        let mut got = ids(&out);
        got.sort();
        assert_eq!(got, vec!["never", "old"]);
    }

    #[test]
    fn disabled_threshold_keeps_everyone() {
        let opts = FilterSortOptions {
            inactivity_filter: Some(InactivityFilter::from_input("abc", TimeUnit::Days)),
            ..Default::default()
        };
        assert_eq!(
            compute_displayed_roster(&sample(), &HashSet::new(), &opts, now()).len(),
            5
        );
    }

    #[test]
    fn unparseable_last_login_counts_as_never_seen() {
        let opts = FilterSortOptions {
            inactivity_filter: Some(InactivityFilter::new(1, TimeUnit::Days)),
            sort_mode: SortMode::OldestFirst,
            ..Default::default()
        };
        let out = compute_displayed_roster(&sample(), &HashSet::new(), &opts, now());
        // 缺失值排最前，二者之间保持输入顺序
        assert_eq!(ids(&out), vec!["usr_2", "usr_4", "usr_3", "usr_1", "usr_5"]);
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let friends = vec![
            FriendRecord::new("b", "Bob"),
            FriendRecord::new("a", "alice"),
            FriendRecord::new("c", "Carol"),
        ];
        let mut opts = FilterSortOptions {
            sort_mode: SortMode::NameAscending,
            ..Default::default()
        };
        let asc = compute_displayed_roster(&friends, &HashSet::new(), &opts, now());
        assert_eq!(names(&asc), vec!["alice", "Bob", "Carol"]);

        opts.sort_mode = SortMode::NameDescending;
        let desc = compute_displayed_roster(&friends, &HashSet::new(), &opts, now());
        let mut reversed = names(&asc);
        reversed.reverse();
        assert_eq!(names(&desc), reversed);
    }

    #[test]
    fn name_ties_keep_input_order() {
        let friends = vec![
            FriendRecord::new("1", "sam"),
            FriendRecord::new("2", "Sam"),
            FriendRecord::new("3", "SAM"),
        ];
        for mode in [SortMode::NameAscending, SortMode::NameDescending] {
            let opts = FilterSortOptions {
                sort_mode: mode,
                ..Default::default()
            };
            let out = compute_displayed_roster(&friends, &HashSet::new(), &opts, now());
            assert_eq!(ids(&out), vec!["1", "2", "3"]);
        }
    }

    #[test]
    fn newest_first_puts_never_seen_last() {
        let opts = FilterSortOptions {
            sort_mode: SortMode::NewestFirst,
            ..Default::default()
        };
        let out = compute_displayed_roster(&sample(), &HashSet::new(), &opts, now());
        assert_eq!(ids(&out), vec!["usr_5", "usr_1", "usr_3", "usr_2", "usr_4"]);
    }

    #[test]
    fn output_is_subset_without_duplicates_and_stable() {
        let input = sample();
        let favs: HashSet<String> = ["usr_3".to_string()].into();
        let opts = FilterSortOptions {
            exclude_favorites: true,
            inactivity_filter: Some(InactivityFilter::new(1, TimeUnit::Months)),
            sort_mode: SortMode::OldestFirst,
        };
        let first = compute_displayed_roster(&input, &favs, &opts, now());
        let second = compute_displayed_roster(&input, &favs, &opts, now());
        assert_eq!(first, second);

        let unique: HashSet<&str> = ids(&first).into_iter().collect();
        assert_eq!(unique.len(), first.len());
        assert!(first.iter().all(|f| input.contains(f)));
        // 输入没有被修改
        assert_eq!(input, sample());
    }
}
