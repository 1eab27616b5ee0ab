//! 网容器：以唯一 id 保存库所、迁移与弧，负责插入校验、标识快照与诊断输出。
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::structure::{Arc, ArcKind, Place, Transition, Weight};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("duplicate place id {0}")]
    DuplicatePlace(PlaceId),
    #[error("duplicate transition id {0}")]
    DuplicateTransition(TransitionId),
    #[error("duplicate arc id {0}")]
    DuplicateArc(ArcId),
    #[error("arc {arc} references unknown place {place}")]
    UnknownPlace { arc: ArcId, place: PlaceId },
    #[error("arc {arc} references unknown transition {transition}")]
    UnknownTransition {
        arc: ArcId,
        transition: TransitionId,
    },
}

/// 标识快照：按库所插入顺序记录 token 数。
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking(IndexMap<PlaceId, Weight>);

impl Marking {
    pub fn tokens(&self, place: &str) -> Option<Weight> {
        self.0.get(place).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaceId, &Weight)> {
        self.0.iter()
    }

    pub fn total(&self) -> Weight {
        self.0.values().fold(0, |acc, w| acc.saturating_add(*w))
    }
}

impl FromIterator<(PlaceId, Weight)> for Marking {
    fn from_iter<I: IntoIterator<Item = (PlaceId, Weight)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place.as_str(), tokens);
        }
        map.finish()
    }
}

/// 连通性诊断报告
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// 没有任何弧相连的库所
    pub isolated_places: Vec<PlaceId>,
    /// 没有任何弧相连的迁移
    pub isolated_transitions: Vec<TransitionId>,
    /// 没有输入弧、因而总是可发生的迁移
    pub source_transitions: Vec<TransitionId>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
    pub total_arcs: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

/// [`Net`] 的序列化形态；反序列化经由 [`Net::from_parts`]，重复 id 与悬空弧会被拒绝。
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NetParts {
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NetParts", into = "NetParts")]
pub struct Net {
    places: IndexMap<PlaceId, Place>,
    transitions: IndexMap<TransitionId, Transition>,
    arcs: IndexMap<ArcId, Arc>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places.values().collect::<Vec<_>>())
            .field("transitions", &self.transitions.values().collect::<Vec<_>>())
            .field("arcs", &self.arcs.values().collect::<Vec<_>>())
            .finish()
    }
}

impl TryFrom<NetParts> for Net {
    type Error = NetError;

    fn try_from(parts: NetParts) -> Result<Self, Self::Error> {
        Net::from_parts(parts.places, parts.transitions, parts.arcs)
    }
}

impl From<Net> for NetParts {
    fn from(net: Net) -> Self {
        NetParts {
            places: net.places.into_values().collect(),
            transitions: net.transitions.into_values().collect(),
            arcs: net.arcs.into_values().collect(),
        }
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_parts(
        places: impl IntoIterator<Item = Place>,
        transitions: impl IntoIterator<Item = Transition>,
        arcs: impl IntoIterator<Item = Arc>,
    ) -> Result<Self, NetError> {
        let mut net = Net::empty();
        for place in places {
            net.add_place(place)?;
        }
        for transition in transitions {
            net.add_transition(transition)?;
        }
        for arc in arcs {
            net.add_arc(arc)?;
        }
        Ok(net)
    }

    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, NetError> {
        if self.places.contains_key(&place.id) {
            return Err(NetError::DuplicatePlace(place.id));
        }
        let id = place.id.clone();
        self.places.insert(id.clone(), place);
        Ok(id)
    }

    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionId, NetError> {
        if self.transitions.contains_key(&transition.id) {
            return Err(NetError::DuplicateTransition(transition.id));
        }
        let id = transition.id.clone();
        self.transitions.insert(id.clone(), transition);
        Ok(id)
    }

    /// 插入弧；两端必须已存在于本网中。
    pub fn add_arc(&mut self, arc: Arc) -> Result<ArcId, NetError> {
        if self.arcs.contains_key(&arc.id) {
            return Err(NetError::DuplicateArc(arc.id));
        }
        if !self.places.contains_key(&arc.place) {
            return Err(NetError::UnknownPlace {
                arc: arc.id,
                place: arc.place,
            });
        }
        if !self.transitions.contains_key(&arc.transition) {
            return Err(NetError::UnknownTransition {
                arc: arc.id,
                transition: arc.transition,
            });
        }
        let id = arc.id.clone();
        self.arcs.insert(id.clone(), arc);
        Ok(id)
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.get(id)
    }

    pub fn place_mut(&mut self, id: &str) -> Option<&mut Place> {
        self.places.get_mut(id)
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    pub fn arc(&self, id: &str) -> Option<&Arc> {
        self.arcs.get(id)
    }

    pub fn arc_mut(&mut self, id: &str) -> Option<&mut Arc> {
        self.arcs.get_mut(id)
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.values()
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn input_arcs<'a>(&'a self, transition: &'a str) -> impl Iterator<Item = &'a Arc> + 'a {
        self.arcs
            .values()
            .filter(move |arc| arc.kind.is_input() && arc.transition.as_str() == transition)
    }

    pub fn output_arcs<'a>(&'a self, transition: &'a str) -> impl Iterator<Item = &'a Arc> + 'a {
        self.arcs
            .values()
            .filter(move |arc| !arc.kind.is_input() && arc.transition.as_str() == transition)
    }

    /// 拆分借用，以便把弧作用到其库所上。
    pub fn arc_and_place_mut(&mut self, arc: &str) -> Option<(&Arc, &mut Place)> {
        let arc = self.arcs.get(arc)?;
        let place = self.places.get_mut(&arc.place)?;
        Some((arc, place))
    }

    pub fn marking(&self) -> Marking {
        self.places
            .values()
            .map(|place| (place.id.clone(), place.marking))
            .collect()
    }

    /// 写回快照中出现的库所；快照之外的库所保持不变。
    pub fn restore(&mut self, marking: &Marking) {
        for (id, tokens) in marking.iter() {
            if let Some(place) = self.places.get_mut(id) {
                place.marking = *tokens;
            }
        }
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for place in self.places.values() {
            let label = format!(
                "{}\\n{}",
                escape_label(place.label.as_deref().unwrap_or(place.id.as_str())),
                place.marking
            );
            let _ = writeln!(
                &mut dot,
                "    \"p_{}\" [label=\"{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                escape_label(place.id.as_str()),
                label
            );
        }

        for transition in self.transitions.values() {
            let label = escape_label(transition.label.as_deref().unwrap_or(transition.id.as_str()));
            let _ = writeln!(
                &mut dot,
                "    \"t_{}\" [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                escape_label(transition.id.as_str()),
                label
            );
        }

        for arc in self.arcs.values() {
            let place_node = format!("\"p_{}\"", escape_label(arc.place.as_str()));
            let transition_node = format!("\"t_{}\"", escape_label(arc.transition.as_str()));
            let (from, to) = if arc.kind.is_input() {
                (place_node, transition_node)
            } else {
                (transition_node, place_node)
            };
            let style = match arc.kind {
                ArcKind::RegularIn | ArcKind::RegularOut => "",
                ArcKind::Inhibitor => ", arrowhead=odot",
                ArcKind::Read => ", style=dashed",
                ArcKind::Reset => ", arrowhead=normalnormal",
            };
            let _ = writeln!(
                &mut dot,
                "    {} -> {} [label=\"{}\"{}];",
                from,
                to,
                escape_label(&arc.multiplicity.to_string()),
                style
            );
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }

    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
            total_arcs: self.arcs_len(),
            ..DiagnosticReport::default()
        };

        for place in self.places.values() {
            let connected = self.arcs.values().any(|arc| arc.place == place.id);
            if !connected {
                report.isolated_places.push(place.id.clone());
            }
        }

        for transition in self.transitions.values() {
            let id = transition.id.as_str();
            let has_preset = self.input_arcs(id).next().is_some();
            let has_postset = self.output_arcs(id).next().is_some();
            match (has_preset, has_postset) {
                (false, false) => report.isolated_transitions.push(transition.id.clone()),
                (false, true) => report.source_transitions.push(transition.id.clone()),
                (true, false) => report.warnings.push(format!(
                    "transition '{}' has no output arcs, its tokens are only consumed",
                    id
                )),
                (true, true) => {}
            }
        }

        for arc in self.arcs.values() {
            if !arc.multiplicity.dynamic && arc.multiplicity.weight().is_none() {
                report.warnings.push(format!(
                    "arc '{}' has non-numeric literal multiplicity {:?}",
                    arc.id, arc.multiplicity.expression
                ));
            }
        }

        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();

        if report.has_issues() {
            log::warn!(
                "net has {} places, {} transitions, {} arcs",
                report.total_places,
                report.total_transitions,
                report.total_arcs
            );
            for id in &report.isolated_places {
                log::warn!("  isolated place {}", id);
            }
            for id in &report.isolated_transitions {
                log::warn!("  isolated transition {}", id);
            }
            for warning in &report.warnings {
                log::warn!("  {}", warning);
            }
        } else {
            log::info!("net connectivity check passed");
        }
        for id in &report.source_transitions {
            log::debug!("transition {} has no input arcs and is always enabled", id);
        }
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
