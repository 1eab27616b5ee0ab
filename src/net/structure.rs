//! 网静态结构元素：库所、迁移、弧及其倍数（multiplicity）与发生语义。
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{ArcId, PlaceId, TransitionId};

pub type Weight = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArcError {
    #[error("arc {arc} cannot fire: place {place} holds {marking}, multiplicity is {multiplicity}")]
    NotFireable {
        arc: ArcId,
        place: PlaceId,
        marking: Weight,
        multiplicity: Weight,
    },
    #[error("arc {arc} has unresolved multiplicity expression {expression:?}")]
    UnresolvedMultiplicity { arc: ArcId, expression: String },
    #[error("arc {arc} of kind {kind:?} does not support {operation}")]
    WrongDirection {
        arc: ArcId,
        kind: ArcKind,
        operation: &'static str,
    },
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub id: PlaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub marking: Weight,
}

impl Place {
    pub fn new(id: impl Into<PlaceId>, marking: Weight) -> Self {
        Self {
            id: id.into(),
            label: None,
            marking,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// 迁移的触发元数据。仅作为数据携带，引擎不会据此等待或调度。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Auto,
    Time {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exact: Option<String>,
    },
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Transition {
    pub id: TransitionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
}

impl Transition {
    pub fn new(id: impl Into<TransitionId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            triggers: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn is_automatic(&self) -> bool {
        self.triggers.iter().any(|t| matches!(t, Trigger::Auto))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.id).finish()
    }
}

/// 弧的折点坐标（布局数据）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// 弧的倍数：字面整数；`dynamic` 为真时在引擎代入前保存外部数据变量的 id。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Multiplicity {
    pub expression: String,
    #[serde(default)]
    pub dynamic: bool,
}

impl Multiplicity {
    pub fn literal(weight: Weight) -> Self {
        Self {
            expression: weight.to_string(),
            dynamic: false,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            expression: name.into(),
            dynamic: true,
        }
    }

    /// 解析当前表达式；动态倍数在变量被代入之前无法求值。
    pub fn weight(&self) -> Option<Weight> {
        self.expression.trim().parse().ok()
    }
}

impl Default for Multiplicity {
    fn default() -> Self {
        Self::literal(1)
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dynamic {
            write!(f, "${}", self.expression)
        } else {
            f.write_str(&self.expression)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    /// 库所 -> 迁移，消耗 `m` 个 token。
    RegularIn,
    /// 迁移 -> 库所，产出 `m` 个 token。
    RegularOut,
    /// 库所 -> 迁移，要求 `marking < m`。
    Inhibitor,
    /// 库所 -> 迁移，要求 `marking >= m`，不消耗。
    Read,
    /// 库所 -> 迁移，清空库所。
    Reset,
}

impl ArcKind {
    /// 构建弧索引时的处理顺序。
    pub const PRECEDENCE: [ArcKind; 5] = [
        ArcKind::Inhibitor,
        ArcKind::Read,
        ArcKind::RegularIn,
        ArcKind::RegularOut,
        ArcKind::Reset,
    ];

    pub fn direction(self) -> ArcDirection {
        match self {
            ArcKind::RegularOut => ArcDirection::TransitionToPlace,
            ArcKind::RegularIn | ArcKind::Inhibitor | ArcKind::Read | ArcKind::Reset => {
                ArcDirection::PlaceToTransition
            }
        }
    }

    pub fn is_input(self) -> bool {
        self.direction() == ArcDirection::PlaceToTransition
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub id: ArcId,
    pub place: PlaceId,
    pub transition: TransitionId,
    pub kind: ArcKind,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<Position>,
}

impl Arc {
    pub fn new(
        id: impl Into<ArcId>,
        place: impl Into<PlaceId>,
        transition: impl Into<TransitionId>,
        kind: ArcKind,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            id: id.into(),
            place: place.into(),
            transition: transition.into(),
            kind,
            multiplicity,
            breakpoints: Vec::new(),
        }
    }

    pub fn direction(&self) -> ArcDirection {
        self.kind.direction()
    }

    fn weight(&self) -> Result<Weight, ArcError> {
        self.multiplicity
            .weight()
            .ok_or_else(|| ArcError::UnresolvedMultiplicity {
                arc: self.id.clone(),
                expression: self.multiplicity.expression.clone(),
            })
    }

    /// 输入弧的前置条件。倍数无法求值时视为不可发生。
    pub fn can_fire(&self, place: &Place) -> bool {
        match self.kind {
            ArcKind::Reset => true,
            ArcKind::RegularOut => false,
            ArcKind::RegularIn | ArcKind::Read => self
                .multiplicity
                .weight()
                .is_some_and(|m| place.marking >= m),
            ArcKind::Inhibitor => self
                .multiplicity
                .weight()
                .is_some_and(|m| place.marking < m),
        }
    }

    /// 把弧作用到源库所，返回实际移除的 token 数，调用方据此原样归还。
    pub fn consume(&self, place: &mut Place) -> Result<Weight, ArcError> {
        match self.kind {
            ArcKind::RegularOut => Err(ArcError::WrongDirection {
                arc: self.id.clone(),
                kind: self.kind,
                operation: "consume",
            }),
            ArcKind::Reset => {
                let drained = place.marking;
                place.marking = 0;
                Ok(drained)
            }
            ArcKind::RegularIn | ArcKind::Inhibitor | ArcKind::Read => {
                let multiplicity = self.weight()?;
                if !self.can_fire(place) {
                    return Err(ArcError::NotFireable {
                        arc: self.id.clone(),
                        place: place.id.clone(),
                        marking: place.marking,
                        multiplicity,
                    });
                }
                if self.kind == ArcKind::RegularIn {
                    place.marking -= multiplicity;
                    Ok(multiplicity)
                } else {
                    Ok(0)
                }
            }
        }
    }

    pub fn produce(&self, place: &mut Place) -> Result<Weight, ArcError> {
        match self.kind {
            ArcKind::RegularOut => {
                let multiplicity = self.weight()?;
                place.marking = place.marking.saturating_add(multiplicity);
                Ok(multiplicity)
            }
            ArcKind::RegularIn | ArcKind::Inhibitor | ArcKind::Read | ArcKind::Reset => {
                Err(ArcError::WrongDirection {
                    arc: self.id.clone(),
                    kind: self.kind,
                    operation: "produce",
                })
            }
        }
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("id", &self.id)
            .field("place", &self.place)
            .field("transition", &self.transition)
            .field("kind", &self.kind)
            .field("multiplicity", &self.multiplicity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(kind: ArcKind, m: Weight) -> Arc {
        Arc::new("a", "p", "t", kind, Multiplicity::literal(m))
    }

    #[test]
    fn regular_in_consumes_multiplicity() {
        let mut place = Place::new("p", 3);
        assert!(arc(ArcKind::RegularIn, 2).can_fire(&place));
        assert_eq!(arc(ArcKind::RegularIn, 2).consume(&mut place), Ok(2));
        assert_eq!(place.marking, 1);

        let err = arc(ArcKind::RegularIn, 2).consume(&mut place).unwrap_err();
        assert!(matches!(err, ArcError::NotFireable { marking: 1, multiplicity: 2, .. }));
        assert_eq!(place.marking, 1);
    }

    #[test]
    fn inhibitor_and_read_only_inspect() {
        let mut place = Place::new("p", 1);
        assert!(!arc(ArcKind::Inhibitor, 1).can_fire(&place));
        assert!(arc(ArcKind::Inhibitor, 2).can_fire(&place));
        assert_eq!(arc(ArcKind::Inhibitor, 2).consume(&mut place), Ok(0));
        assert_eq!(arc(ArcKind::Read, 1).consume(&mut place), Ok(0));
        assert!(arc(ArcKind::Read, 2).consume(&mut place).is_err());
        assert_eq!(place.marking, 1);
    }

    #[test]
    fn reset_drains_and_reports_drained_amount() {
        let mut place = Place::new("p", 5);
        let reset = arc(ArcKind::Reset, 1);
        assert!(reset.can_fire(&place));
        assert_eq!(reset.consume(&mut place), Ok(5));
        assert_eq!(place.marking, 0);
        assert_eq!(reset.consume(&mut place), Ok(0));
    }

    #[test]
    fn produce_only_on_output_arcs() {
        let mut place = Place::new("p", 0);
        assert_eq!(arc(ArcKind::RegularOut, 3).produce(&mut place), Ok(3));
        assert_eq!(place.marking, 3);
        assert!(matches!(
            arc(ArcKind::RegularIn, 1).produce(&mut place),
            Err(ArcError::WrongDirection { .. })
        ));
        assert!(matches!(
            arc(ArcKind::RegularOut, 1).consume(&mut place),
            Err(ArcError::WrongDirection { .. })
        ));
    }

    #[test]
    fn unresolved_variable_blocks_firing() {
        let mut place = Place::new("p", 10);
        let dynamic = Arc::new("a", "p", "t", ArcKind::RegularIn, Multiplicity::variable("x"));
        assert!(!dynamic.can_fire(&place));
        assert!(matches!(
            dynamic.consume(&mut place),
            Err(ArcError::UnresolvedMultiplicity { .. })
        ));
        assert_eq!(place.marking, 10);
    }
}
