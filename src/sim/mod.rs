//! # 令牌博弈（token game）模拟
//!
//! 模拟器在构造时深拷贝传入的网：拷贝是可变的模拟模型，原网保持不变以便 `reset`。
//! 每个迁移处于三种状态之一：不可发生、可发生、已分配（assigned）。
//!
//! * `assign(t)`：按弧索引顺序消耗 `t` 的全部输入弧，并在账本中记录每条弧实际移除的数量；
//! * `finish(t)`：对 `t` 的全部输出弧执行产出；
//! * `cancel(t)`：按账本把消耗的 token 归还到源库所；
//! * `fire(t)`：`assign` 之后立即 `finish`。
//!
//! 可发生性检查通过“先执行、后回滚”实现：在 [`guard::MarkingGuard`] 的作用域内
//! 消耗全部输入弧，无论成败，守卫析构时都会恢复标识。因此检查与实际执行不会出现分歧。
//!
//! ```rust
//! use pnsim::net::*;
//! use pnsim::sim::{BasicSimulation, Simulation, TaskSimulation};
//!
//! let net = Net::from_parts(
//!     [Place::new("p1", 2), Place::new("p2", 0)],
//!     [Transition::new("t1")],
//!     [
//!         Arc::new("a1", "p1", "t1", ArcKind::RegularIn, Multiplicity::literal(1)),
//!         Arc::new("a2", "p2", "t1", ArcKind::RegularOut, Multiplicity::literal(1)),
//!     ],
//! )
//! .unwrap();
//!
//! let mut sim = BasicSimulation::new(net, Default::default());
//! assert!(sim.is_enabled("t1"));
//! sim.assign("t1").unwrap();
//! assert_eq!(sim.marking().tokens("p1"), Some(1));
//! sim.finish("t1").unwrap();
//! assert_eq!(sim.marking().tokens("p2"), Some(1));
//! ```

pub mod basic;
pub mod guard;
pub mod index;
pub mod state;
pub mod transition;

use indexmap::IndexMap;
use thiserror::Error;

use crate::net::{ArcError, Marking, Net, TransitionId};

pub use basic::BasicSimulation;
pub use transition::TransitionSimulation;

/// 外部数据变量的当前值，以变量 id 为键。
pub type DataValues = IndexMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("cannot construct a simulation without a net")]
    MissingNet,
    #[error("transition {0} does not exist in the simulated net")]
    UnknownTransition(TransitionId),
    #[error("transition {0} is not enabled")]
    NotEnabled(TransitionId),
    #[error("transition {0} is already assigned")]
    AlreadyAssigned(TransitionId),
    #[error("transition {0} is not assigned")]
    NotAssigned(TransitionId),
    #[error("transition {transition}: {source}")]
    Arc {
        transition: TransitionId,
        #[source]
        source: ArcError,
    },
}

/// 所有引擎共有的查询与单步发生。
///
/// `is_enabled` 与 `enabled` 需要 `&mut self`：检查会在工作副本上执行消耗再回滚，
/// 之后观察到的标识与检查前完全相同。
pub trait Simulation {
    fn model(&self) -> &Net;

    fn marking(&self) -> Marking {
        self.model().marking()
    }

    fn is_enabled(&mut self, transition: &str) -> bool;

    fn enabled(&mut self) -> Vec<TransitionId> {
        let ids: Vec<TransitionId> = self.model().transitions().map(|t| t.id.clone()).collect();
        ids.into_iter()
            .filter(|id| self.is_enabled(id.as_str()))
            .collect()
    }

    fn fire(&mut self, transition: &str) -> Result<(), SimError>;

    fn reset(&mut self);
}

/// assign/finish/cancel 任务生命周期。
pub trait TaskSimulation: Simulation {
    fn assign(&mut self, transition: &str) -> Result<(), SimError>;

    fn finish(&mut self, transition: &str) -> Result<(), SimError>;

    fn cancel(&mut self, transition: &str) -> Result<(), SimError>;

    fn is_assigned(&self, transition: &str) -> bool;

    fn assigned(&self) -> Vec<TransitionId> {
        self.model()
            .transitions()
            .filter(|t| self.is_assigned(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect()
    }
}

/// 原网与工作副本。
#[derive(Debug, Clone)]
pub struct SimulationModel {
    original: Net,
    model: Net,
}

impl SimulationModel {
    pub fn new(original: Net) -> Self {
        let model = original.clone();
        Self { original, model }
    }

    pub fn original(&self) -> &Net {
        &self.original
    }

    pub fn model(&self) -> &Net {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Net {
        &mut self.model
    }

    /// 丢弃工作副本并重新从原网克隆。
    pub fn reset(&mut self) {
        self.model = self.original.clone();
    }

    pub fn transition_id(&self, transition: &str) -> Result<TransitionId, SimError> {
        self.model
            .transition(transition)
            .map(|t| t.id.clone())
            .ok_or_else(|| SimError::UnknownTransition(transition.into()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    net: Option<Net>,
    data: DataValues,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn net(mut self, net: Net) -> Self {
        self.net = Some(net);
        self
    }

    pub fn maybe_net(mut self, net: Option<Net>) -> Self {
        self.net = net;
        self
    }

    pub fn data(mut self, data: DataValues) -> Self {
        self.data = data;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: f64) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    pub fn build_basic(self) -> Result<BasicSimulation, SimError> {
        let net = self.net.ok_or(SimError::MissingNet)?;
        Ok(BasicSimulation::new(net, self.data))
    }

    pub fn build_transition(self) -> Result<TransitionSimulation, SimError> {
        let net = self.net.ok_or(SimError::MissingNet)?;
        if !self.data.is_empty() {
            log::debug!("transition simulation ignores {} data values", self.data.len());
        }
        Ok(TransitionSimulation::new(net))
    }
}
