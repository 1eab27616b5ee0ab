//! 完整模拟器：assign/finish/cancel 生命周期、推测式可发生性检查与动态倍数代入。
use crate::net::Net;
use crate::sim::guard::MarkingGuard;
use crate::sim::index::ArcIndex;
use crate::sim::state::RunState;
use crate::sim::{DataValues, SimError, Simulation, SimulationModel, TaskSimulation};

#[derive(Debug, Clone)]
pub struct BasicSimulation {
    model: SimulationModel,
    index: ArcIndex,
    state: RunState,
    data: DataValues,
}

impl BasicSimulation {
    pub fn new(net: Net, data: DataValues) -> Self {
        let model = SimulationModel::new(net);
        let index = ArcIndex::build(model.model());
        let mut simulation = Self {
            model,
            index,
            state: RunState::default(),
            data,
        };
        simulation.update_references();
        simulation
    }

    pub fn original(&self) -> &Net {
        self.model.original()
    }

    pub fn data(&self) -> &DataValues {
        &self.data
    }

    pub fn index(&self) -> &ArcIndex {
        &self.index
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// 替换全部变量值并重新代入。
    pub fn update_data(&mut self, data: DataValues) {
        self.data = data;
        self.update_references();
    }

    /// 对原始倍数为变量引用的弧，用变量当前值改写其实时倍数。
    /// 总是从构建时捕获的原始倍数出发，重复调用不会叠加；缺失的变量不改动该弧。
    pub fn update_references(&mut self) {
        let net = self.model.model_mut();
        for (arc_id, original) in self.index.dynamic_arcs() {
            let Some(value) = self.data.get(original.expression.as_str()) else {
                log::debug!(
                    "arc {} references variable {:?} which has no value",
                    arc_id,
                    original.expression
                );
                continue;
            };
            let Some(arc) = net.arc_mut(arc_id.as_str()) else {
                continue;
            };
            let literal = render_value(*value);
            if arc.multiplicity.expression != literal {
                log::trace!(
                    "arc {} multiplicity {} -> {}",
                    arc_id,
                    arc.multiplicity.expression,
                    literal
                );
                arc.multiplicity.expression = literal;
            }
        }
    }
}

/// 非负整数值按整数字面量代入（`7.0` -> `"7"`），其余值无法作为倍数求值。
fn render_value(value: f64) -> String {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
        format!("{}", value as u64)
    } else {
        value.to_string()
    }
}

impl Simulation for BasicSimulation {
    fn model(&self) -> &Net {
        self.model.model()
    }

    fn is_enabled(&mut self, transition: &str) -> bool {
        if self.model.model().transition(transition).is_none() {
            return false;
        }
        let mut guard = MarkingGuard::new(self.model.model_mut());
        match self.index.consume_inputs(&mut guard, transition) {
            Ok(_) => true,
            Err(err) => {
                log::trace!("transition {} not enabled: {}", transition, err);
                false
            }
        }
    }

    fn fire(&mut self, transition: &str) -> Result<(), SimError> {
        self.assign(transition)?;
        if let Err(err) = self.finish(transition) {
            self.cancel(transition)?;
            return Err(err);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.model.reset();
        self.index = ArcIndex::build(self.model.model());
        self.state = RunState::default();
        self.update_references();
        log::debug!("simulation reset");
    }
}

impl TaskSimulation for BasicSimulation {
    fn assign(&mut self, transition: &str) -> Result<(), SimError> {
        let id = self.model.transition_id(transition)?;
        if !self.is_enabled(transition) {
            return Err(SimError::NotEnabled(id));
        }
        if self.state.is_assigned(transition) {
            return Err(SimError::AlreadyAssigned(id));
        }

        let consumed = {
            let mut guard = MarkingGuard::new(self.model.model_mut());
            let consumed = self
                .index
                .consume_inputs(&mut guard, transition)
                .map_err(|source| SimError::Arc {
                    transition: id.clone(),
                    source,
                })?;
            guard.commit();
            consumed
        };

        log::debug!("assigned {} ({} input arcs)", id, consumed.len());
        self.state.assign(id, consumed);
        self.update_references();
        Ok(())
    }

    fn finish(&mut self, transition: &str) -> Result<(), SimError> {
        let id = self.model.transition_id(transition)?;
        if !self.state.is_assigned(transition) {
            return Err(SimError::NotAssigned(id));
        }

        {
            let mut guard = MarkingGuard::new(self.model.model_mut());
            self.index
                .produce_outputs(&mut guard, transition)
                .map_err(|source| SimError::Arc {
                    transition: id.clone(),
                    source,
                })?;
            guard.commit();
        }

        self.state.release(transition, self.index.inputs(transition));
        log::debug!("finished {}", id);
        self.update_references();
        Ok(())
    }

    fn cancel(&mut self, transition: &str) -> Result<(), SimError> {
        let id = self.model.transition_id(transition)?;
        if !self.state.is_assigned(transition) {
            return Err(SimError::NotAssigned(id));
        }

        let net = self.model.model_mut();
        for arc in self.index.inputs(transition) {
            let quantity = self.state.take_consumed(arc.as_str());
            if quantity == 0 {
                continue;
            }
            if let Some((_, place)) = net.arc_and_place_mut(arc.as_str()) {
                place.marking = place.marking.saturating_add(quantity);
                log::trace!("arc {} returned {} to {}", arc, quantity, place.id);
            }
        }

        self.state.release(transition, self.index.inputs(transition));
        log::debug!("cancelled {}", id);
        self.update_references();
        Ok(())
    }

    fn is_assigned(&self, transition: &str) -> bool {
        self.state.is_assigned(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Arc, ArcKind, Multiplicity, Place, Transition, TransitionId};

    fn chain() -> Net {
        Net::from_parts(
            [Place::new("p1", 2), Place::new("p2", 0)],
            [Transition::new("t1")],
            [
                Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::literal(1)),
                Arc::new("a2", "p2", "t1", ArcKind::RegularOut, Multiplicity::literal(1)),
            ],
        )
        .unwrap()
    }

    fn tokens(sim: &BasicSimulation, place: &str) -> u64 {
        sim.model().place(place).unwrap().marking
    }

    #[test]
    fn assign_then_finish_moves_tokens() {
        let mut sim = BasicSimulation::new(chain(), DataValues::new());
        assert!(sim.is_enabled("t1"));
        sim.assign("t1").unwrap();
        assert_eq!(tokens(&sim, "p1"), 1);
        assert!(sim.is_assigned("t1"));
        assert_eq!(sim.assigned(), vec![TransitionId::from("t1")]);
        sim.finish("t1").unwrap();
        assert_eq!(tokens(&sim, "p2"), 1);
        assert!(!sim.is_assigned("t1"));
        assert_eq!(sim.state().consumed("a1"), None);
    }

    #[test]
    fn lifecycle_errors_name_the_transition() {
        let mut sim = BasicSimulation::new(chain(), DataValues::new());
        assert_eq!(sim.finish("t1"), Err(SimError::NotAssigned("t1".into())));
        assert_eq!(sim.cancel("t1"), Err(SimError::NotAssigned("t1".into())));
        assert_eq!(sim.assign("t9"), Err(SimError::UnknownTransition("t9".into())));

        sim.assign("t1").unwrap();
        assert_eq!(sim.assign("t1"), Err(SimError::AlreadyAssigned("t1".into())));
        sim.model.model_mut().place_mut("p1").unwrap().marking = 0;
        assert_eq!(sim.assign("t1"), Err(SimError::NotEnabled("t1".into())));
    }

    #[test]
    fn cancel_restores_consumed_tokens() {
        let mut sim = BasicSimulation::new(chain(), DataValues::new());
        sim.assign("t1").unwrap();
        sim.cancel("t1").unwrap();
        assert_eq!(tokens(&sim, "p1"), 2);
        assert!(!sim.is_assigned("t1"));
        assert!(sim.assigned().is_empty());
    }

    #[test]
    fn fire_fails_like_assign() {
        let mut sim = BasicSimulation::new(chain(), DataValues::new());
        sim.fire("t1").unwrap();
        sim.fire("t1").unwrap();
        assert_eq!(sim.fire("t1"), Err(SimError::NotEnabled("t1".into())));
        assert_eq!(tokens(&sim, "p1"), 0);
        assert_eq!(tokens(&sim, "p2"), 2);
    }

    #[test]
    fn unresolved_output_rolls_back_fire() {
        let net = Net::from_parts(
            [Place::new("p1", 1), Place::new("p2", 0)],
            [Transition::new("t1")],
            [
                Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::literal(1)),
                Arc::new("a2", "p2", "t1", ArcKind::RegularOut, Multiplicity::variable("y")),
            ],
        )
        .unwrap();
        let mut sim = BasicSimulation::new(net, DataValues::new());
        assert!(matches!(sim.fire("t1"), Err(SimError::Arc { .. })));
        assert_eq!(tokens(&sim, "p1"), 1);
        assert!(!sim.is_assigned("t1"));

        sim.update_data(DataValues::from([("y".to_string(), 3.0)]));
        sim.fire("t1").unwrap();
        assert_eq!(tokens(&sim, "p2"), 3);
    }

    #[test]
    fn dynamic_multiplicity_follows_data() {
        let net = Net::from_parts(
            [Place::new("p1", 5)],
            [Transition::new("t1")],
            [Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::variable("x"))],
        )
        .unwrap();
        let mut sim = BasicSimulation::new(net, DataValues::new());
        assert!(!sim.is_enabled("t1"));
        assert_eq!(sim.model().arc("a1").unwrap().multiplicity.expression, "x");

        sim.update_data(DataValues::from([("x".to_string(), 7.0)]));
        assert_eq!(sim.model().arc("a1").unwrap().multiplicity.expression, "7");
        assert!(!sim.is_enabled("t1"));

        sim.update_data(DataValues::from([("x".to_string(), 4.0)]));
        assert_eq!(sim.model().arc("a1").unwrap().multiplicity.expression, "4");
        assert!(sim.is_enabled("t1"));

        sim.update_data(DataValues::new());
        assert_eq!(sim.model().arc("a1").unwrap().multiplicity.expression, "4");
        assert_eq!(sim.original().arc("a1").unwrap().multiplicity.expression, "x");
    }

    #[test]
    fn fractional_values_do_not_resolve() {
        assert_eq!(render_value(7.0), "7");
        assert_eq!(render_value(0.0), "0");
        assert_eq!(render_value(2.5), "2.5");
        assert_eq!(render_value(-1.0), "-1");
        assert!(render_value(u64::MAX as f64).parse::<u64>().is_err());
        assert_eq!(render_value(18446744073709549568.0), "18446744073709549568");
    }

    #[test]
    fn reset_matches_fresh_construction() {
        let data = DataValues::from([("x".to_string(), 1.0)]);
        let net = Net::from_parts(
            [Place::new("p1", 3), Place::new("p2", 0)],
            [Transition::new("t1")],
            [
                Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::variable("x")),
                Arc::new("a2", "p2", "t1", ArcKind::RegularOut, Multiplicity::literal(2)),
            ],
        )
        .unwrap();
        let fresh = BasicSimulation::new(net.clone(), data.clone());
        let mut sim = BasicSimulation::new(net, data);
        sim.fire("t1").unwrap();
        sim.assign("t1").unwrap();
        sim.reset();
        assert_eq!(sim.model(), fresh.model());
        assert_eq!(sim.state(), fresh.state());
    }
}
