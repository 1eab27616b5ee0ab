//! 按迁移组织的输入/输出弧索引，以及构建时捕获的原始倍数表。
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::net::{ArcError, ArcId, ArcKind, Multiplicity, Net, PlaceId, TransitionId, Weight};

type ArcList = SmallVec<[ArcId; 4]>;

/// 一次消耗过程中每条输入弧实际移除的数量。
pub type Consumed = SmallVec<[(ArcId, Weight); 4]>;

#[derive(Debug, Clone, Default)]
pub struct ArcIndex {
    inputs: IndexMap<TransitionId, ArcList>,
    outputs: IndexMap<TransitionId, ArcList>,
    originals: IndexMap<ArcId, Multiplicity>,
}

impl ArcIndex {
    /// 按 [`ArcKind::PRECEDENCE`] 逐类访问弧，同类内按网的插入顺序；该顺序即消耗顺序。
    pub fn build(net: &Net) -> Self {
        let mut index = ArcIndex::default();
        for transition in net.transitions() {
            index.inputs.insert(transition.id.clone(), ArcList::new());
            index.outputs.insert(transition.id.clone(), ArcList::new());
        }

        for kind in ArcKind::PRECEDENCE {
            for arc in net.arcs().filter(|arc| arc.kind == kind) {
                let lists = if kind.is_input() {
                    &mut index.inputs
                } else {
                    &mut index.outputs
                };
                lists
                    .entry(arc.transition.clone())
                    .or_default()
                    .push(arc.id.clone());
                index
                    .originals
                    .insert(arc.id.clone(), arc.multiplicity.clone());
            }
        }
        index
    }

    pub fn inputs(&self, transition: &str) -> &[ArcId] {
        self.inputs
            .get(transition)
            .map(|list| list.as_slice())
            .unwrap_or_default()
    }

    pub fn outputs(&self, transition: &str) -> &[ArcId] {
        self.outputs
            .get(transition)
            .map(|list| list.as_slice())
            .unwrap_or_default()
    }

    /// 原始倍数为变量引用的弧。
    pub fn dynamic_arcs(&self) -> impl Iterator<Item = (&ArcId, &Multiplicity)> {
        self.originals.iter().filter(|(_, m)| m.dynamic)
    }

    pub fn input_places(&self, net: &Net, transition: &str) -> Vec<PlaceId> {
        self.inputs(transition)
            .iter()
            .filter_map(|id| net.arc(id.as_str()).map(|arc| arc.place.clone()))
            .collect()
    }

    /// 按索引顺序消耗 `transition` 的全部输入弧，遇到第一条失败的弧即停止。
    /// 之前的弧已修改 `net`，调用方须在 [`MarkingGuard`](crate::sim::guard::MarkingGuard) 内执行。
    pub fn consume_inputs(&self, net: &mut Net, transition: &str) -> Result<Consumed, ArcError> {
        let mut consumed = Consumed::new();
        for id in self.inputs(transition) {
            let Some((arc, place)) = net.arc_and_place_mut(id.as_str()) else {
                continue;
            };
            let quantity = arc.consume(place)?;
            log::trace!("arc {} consumed {} from {}", id, quantity, arc.place);
            consumed.push((id.clone(), quantity));
        }
        Ok(consumed)
    }

    pub fn produce_outputs(&self, net: &mut Net, transition: &str) -> Result<Weight, ArcError> {
        let mut produced: Weight = 0;
        for id in self.outputs(transition) {
            let Some((arc, place)) = net.arc_and_place_mut(id.as_str()) else {
                continue;
            };
            let quantity = arc.produce(place)?;
            log::trace!("arc {} produced {} into {}", id, quantity, arc.place);
            produced = produced.saturating_add(quantity);
        }
        Ok(produced)
    }
}
