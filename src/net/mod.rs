//! # Petri 网图结构
//!
//! 网由库所集合 `P`、迁移集合 `T` 与带类型的弧集合组成，三者均以唯一字符串 id 存储，
//! 并保持插入顺序以保证遍历确定性。每条弧连接一个库所与一个迁移，其方向由弧类型决定：
//!
//! * `RegularIn`（P→T）：可发生当且仅当 `M[p] ≥ m`，发生后 `M[p] -= m`；
//! * `RegularOut`（T→P）：无前置条件，发生后 `M[p] += m`；
//! * `Inhibitor`（P→T）：可发生当且仅当 `M[p] < m`，不改变标识；
//! * `Read`（P→T）：可发生当且仅当 `M[p] ≥ m`，不改变标识；
//! * `Reset`（P→T）：总是可发生，发生后 `M[p] = 0`。
//!
//! 倍数 `m` 可以是字面整数，也可以引用外部数据变量（由模拟引擎代入）。
//!
//! ## 示例
//!
//! ```rust
//! use pnsim::net::*;
//!
//! let mut net = Net::empty();
//! net.add_place(Place::new("p0", 1)).unwrap();
//! net.add_place(Place::new("p1", 0)).unwrap();
//! net.add_transition(Transition::new("t0")).unwrap();
//! net.add_arc(Arc::new("a0", "p0", "t0", ArcKind::RegularIn, Multiplicity::literal(1))).unwrap();
//! net.add_arc(Arc::new("a1", "p1", "t0", ArcKind::RegularOut, Multiplicity::literal(1))).unwrap();
//!
//! assert_eq!(net.marking().tokens("p0"), Some(1));
//! assert!(net.add_place(Place::new("p0", 3)).is_err());
//! ```

pub mod core;
pub mod ids;
pub mod io;
pub mod structure;

pub use self::core::{DiagnosticReport, Marking, Net, NetError, NetParts};
pub use ids::{ArcId, PlaceId, TransitionId};
pub use structure::{
    Arc, ArcDirection, ArcError, ArcKind, Multiplicity, Place, Position, Transition, Trigger,
    Weight,
};
