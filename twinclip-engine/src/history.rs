//! 按目标记录的裁剪撤销栈。

use std::mem;

use twinclip_core::clipping::{ClipMode, PlaneSet};

/// 某一时刻目标上的裁剪状态。`clip` 为 `None` 表示当时没有裁剪，撤销时应清除而非恢复空集。
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<T> {
    pub clip: Option<T>,
    pub mode: Option<ClipMode>,
}

impl<T> HistoryEntry<T> {
    #[inline]
    pub fn none() -> Self {
        Self {
            clip: None,
            mode: None,
        }
    }

    #[inline]
    pub fn new(clip: Option<T>, mode: Option<ClipMode>) -> Self {
        Self { clip, mode }
    }

    #[inline]
    pub fn is_clipped(&self) -> bool {
        self.clip.is_some()
    }
}

impl<T> Default for HistoryEntry<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// 模型平面裁剪的历史条目。
pub type ClipHistoryEntry = HistoryEntry<PlaneSet>;

/// 后进先出的撤销日志。条目按值保存，撤销恢复的是应用前的原始数值而非重新计算结果。
#[derive(Debug, Clone, PartialEq)]
pub struct ClipHistory<T> {
    entries: Vec<HistoryEntry<T>>,
}

impl<T> ClipHistory<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, entry: HistoryEntry<T>) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<HistoryEntry<T>> {
        self.entries.pop()
    }

    #[inline]
    pub fn peek(&self) -> Option<&HistoryEntry<T>> {
        self.entries.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for ClipHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个目标的当前裁剪状态与其撤销栈。
#[derive(Debug, Clone, PartialEq)]
pub struct ClipController<T> {
    current: HistoryEntry<T>,
    history: ClipHistory<T>,
}

impl<T> ClipController<T> {
    pub fn new() -> Self {
        Self {
            current: HistoryEntry::none(),
            history: ClipHistory::new(),
        }
    }

    #[inline]
    pub fn current(&self) -> &HistoryEntry<T> {
        &self.current
    }

    #[inline]
    pub fn history(&self) -> &ClipHistory<T> {
        &self.history
    }

    /// 先把当前状态压栈，再替换为新状态。`clip` 为 `None` 即清除裁剪（同样可撤销）。
    pub fn apply(&mut self, clip: Option<T>, mode: Option<ClipMode>) -> &HistoryEntry<T> {
        let previous = mem::replace(&mut self.current, HistoryEntry::new(clip, mode));
        self.history.push(previous);
        &self.current
    }

    /// 恢复最近一次应用前的状态；栈为空时返回 `None` 且不改变状态。
    pub fn undo(&mut self) -> Option<&HistoryEntry<T>> {
        let previous = self.history.pop()?;
        self.current = previous;
        Some(&self.current)
    }
}

impl<T> Default for ClipController<T> {
    fn default() -> Self {
        Self::new()
    }
}
