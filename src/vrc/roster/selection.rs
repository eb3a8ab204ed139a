use crate::vrc::friend::models::FriendRecord;
use std::collections::BTreeSet;

/// 选中状态：按展示列表当前顺序记录下标
///
/// 展示列表重新计算后下标失效，必须调用 [`Selection::reset`]。
#[derive(Debug, Clone, Default)]
pub struct Selection {
    marked: BTreeSet<usize>,
    len: usize,
}

impl Selection {
    pub fn new(len: usize) -> Self {
        Self {
            marked: BTreeSet::new(),
            len,
        }
    }

    /// 绑定到新的展示列表并清空选中
    pub fn reset(&mut self, len: usize) {
        self.marked.clear();
        self.len = len;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 切换选中；越界返回 false
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        if !self.marked.remove(&index) {
            self.marked.insert(index);
        }
        true
    }

    pub fn set(&mut self, index: usize, marked: bool) -> bool {
        if index >= self.len {
            return false;
        }
        if marked {
            self.marked.insert(index);
        } else {
            self.marked.remove(&index);
        }
        true
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.contains(&index)
    }

    pub fn mark_all(&mut self) {
        self.marked = (0..self.len).collect();
    }

    pub fn unmark_all(&mut self) {
        self.marked.clear();
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// 按展示顺序取出选中的好友（拷贝一份作为批量任务的快照）
    pub fn targets(&self, displayed: &[FriendRecord]) -> Vec<FriendRecord> {
        self.marked
            .iter()
            .filter_map(|&i| displayed.get(i).cloned())
            .collect()
    }
}
