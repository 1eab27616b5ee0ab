//! 精简模拟器：只提供单步 `fire` 与 `is_enabled`，没有分配账本、取消与动态倍数代入。
//! `fire` 只消耗输入弧，输出库所保持不变。
use crate::net::Net;
use crate::sim::guard::MarkingGuard;
use crate::sim::index::ArcIndex;
use crate::sim::{SimError, Simulation, SimulationModel};

#[derive(Debug, Clone)]
pub struct TransitionSimulation {
    model: SimulationModel,
    index: ArcIndex,
}

impl TransitionSimulation {
    pub fn new(net: Net) -> Self {
        let model = SimulationModel::new(net);
        let index = ArcIndex::build(model.model());
        Self { model, index }
    }

    pub fn original(&self) -> &Net {
        self.model.original()
    }
}

impl Simulation for TransitionSimulation {
    fn model(&self) -> &Net {
        self.model.model()
    }

    /// 只对该迁移的输入库所拍快照。
    fn is_enabled(&mut self, transition: &str) -> bool {
        if self.model.model().transition(transition).is_none() {
            return false;
        }
        let places = self.index.input_places(self.model.model(), transition);
        let mut guard = MarkingGuard::scoped(self.model.model_mut(), &places);
        self.index.consume_inputs(&mut guard, transition).is_ok()
    }

    /// 只消耗输入弧，不执行输出弧的产出。
    fn fire(&mut self, transition: &str) -> Result<(), SimError> {
        let id = self.model.transition_id(transition)?;
        if !self.is_enabled(transition) {
            return Err(SimError::NotEnabled(id));
        }

        let places = self.index.input_places(self.model.model(), transition);
        let mut guard = MarkingGuard::scoped(self.model.model_mut(), &places);
        let consumed = self
            .index
            .consume_inputs(&mut guard, transition)
            .map_err(|source| SimError::Arc {
                transition: id.clone(),
                source,
            })?;
        guard.commit();

        log::debug!("fired {} ({} input arcs)", id, consumed.len());
        Ok(())
    }

    fn reset(&mut self) {
        self.model.reset();
        self.index = ArcIndex::build(self.model.model());
        log::debug!("transition simulation reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Arc, ArcKind, Multiplicity, Place, Transition, TransitionId};

    fn net() -> Net {
        Net::from_parts(
            [Place::new("p1", 1), Place::new("p2", 0), Place::new("guard", 0)],
            [Transition::new("t1"), Transition::new("t2")],
            [
                Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::literal(1)),
                Arc::new("a2", "p2", "t1", ArcKind::RegularOut, Multiplicity::literal(2)),
                Arc::new("a3", "guard", "t1", ArcKind::Inhibitor, Multiplicity::literal(1)),
                Arc::new("a4", "p2", "t2", ArcKind::Reset, Multiplicity::literal(1)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn fire_consumes_inputs_only() {
        let mut sim = TransitionSimulation::new(net());
        assert_eq!(
            sim.enabled(),
            vec![TransitionId::from("t1"), TransitionId::from("t2")]
        );
        sim.fire("t1").unwrap();
        assert_eq!(sim.marking().tokens("p1"), Some(0));
        assert_eq!(sim.marking().tokens("p2"), Some(0));
        assert_eq!(sim.fire("t1"), Err(SimError::NotEnabled("t1".into())));
    }

    #[test]
    fn reset_arc_drains_on_fire() {
        let mut sim = TransitionSimulation::new(net());
        sim.model.model_mut().place_mut("p2").unwrap().marking = 4;
        sim.fire("t2").unwrap();
        assert_eq!(sim.marking().tokens("p2"), Some(0));
        assert_eq!(sim.marking().tokens("p1"), Some(1));
    }

    #[test]
    fn inhibitor_blocks_and_check_is_pure() {
        let mut sim = TransitionSimulation::new(net());
        sim.model.model_mut().place_mut("guard").unwrap().marking = 1;
        let before = sim.marking();
        for _ in 0..3 {
            assert!(!sim.is_enabled("t1"));
        }
        assert_eq!(sim.marking(), before);
        assert!(!sim.is_enabled("nope"));
        assert_eq!(sim.fire("nope"), Err(SimError::UnknownTransition("nope".into())));
    }

    #[test]
    fn dynamic_arcs_are_never_resolved() {
        let net = Net::from_parts(
            [Place::new("p1", 3)],
            [Transition::new("t1")],
            [Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::variable("x"))],
        )
        .unwrap();
        let mut sim = TransitionSimulation::new(net);
        assert!(!sim.is_enabled("t1"));
    }

    #[test]
    fn reset_restores_original() {
        let mut sim = TransitionSimulation::new(net());
        sim.fire("t1").unwrap();
        sim.reset();
        assert_eq!(sim.model(), sim.original());
    }
}
