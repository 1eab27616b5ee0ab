//! 一次模拟运行的可变状态：已分配迁移集合与按弧记录的消耗账本。
use std::collections::HashMap;

use indexmap::IndexSet;

use crate::net::{ArcId, TransitionId, Weight};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    assigned: IndexSet<TransitionId>,
    consumed: HashMap<ArcId, Weight>,
}

impl RunState {
    pub fn is_assigned(&self, transition: &str) -> bool {
        self.assigned.contains(transition)
    }

    /// 标记 `transition` 为已分配，并记录每条输入弧移除的数量。
    pub fn assign(
        &mut self,
        transition: TransitionId,
        consumed: impl IntoIterator<Item = (ArcId, Weight)>,
    ) {
        self.consumed.extend(consumed);
        self.assigned.insert(transition);
    }

    /// 取出 `arc` 的记录数量，没有记录时为 0。
    pub fn take_consumed(&mut self, arc: &str) -> Weight {
        self.consumed.remove(arc).unwrap_or(0)
    }

    pub fn consumed(&self, arc: &str) -> Option<Weight> {
        self.consumed.get(arc).copied()
    }

    /// 移出已分配集合并清理其输入弧的账本条目。
    pub fn release<'a>(&mut self, transition: &str, inputs: impl IntoIterator<Item = &'a ArcId>) {
        for arc in inputs {
            self.consumed.remove(arc);
        }
        self.assigned.shift_remove(transition);
    }
}
