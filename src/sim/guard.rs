//! 标识回滚守卫：在作用域结束时（包括提前返回）把库所标识恢复为快照。
use std::ops::{Deref, DerefMut};

use crate::net::{Marking, Net, PlaceId};

/// 析构时恢复构造时的快照，除非已调用 [`MarkingGuard::commit`]。
pub struct MarkingGuard<'a> {
    net: &'a mut Net,
    snapshot: Option<Marking>,
}

impl<'a> MarkingGuard<'a> {
    /// 对全部库所拍快照。
    pub fn new(net: &'a mut Net) -> Self {
        let snapshot = net.marking();
        Self {
            net,
            snapshot: Some(snapshot),
        }
    }

    /// 只对给定库所拍快照；其余库所不得在守卫期间被修改。
    pub fn scoped<'p>(net: &'a mut Net, places: impl IntoIterator<Item = &'p PlaceId>) -> Self {
        let snapshot = places
            .into_iter()
            .filter_map(|id| net.place(id.as_str()).map(|p| (id.clone(), p.marking)))
            .collect();
        Self {
            net,
            snapshot: Some(snapshot),
        }
    }

    pub fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Deref for MarkingGuard<'_> {
    type Target = Net;

    fn deref(&self) -> &Net {
        self.net
    }
}

impl DerefMut for MarkingGuard<'_> {
    fn deref_mut(&mut self) -> &mut Net {
        self.net
    }
}

impl Drop for MarkingGuard<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.net.restore(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Place;

    fn sample() -> Net {
        Net::from_parts([Place::new("p1", 3), Place::new("p2", 1)], [], []).unwrap()
    }

    #[test]
    fn drop_restores_marking() {
        let mut net = sample();
        {
            let mut guard = MarkingGuard::new(&mut net);
            guard.place_mut("p1").unwrap().marking = 0;
            guard.place_mut("p2").unwrap().marking = 8;
        }
        assert_eq!(net.marking(), sample().marking());
    }

    #[test]
    fn early_return_still_restores() {
        fn drain(net: &mut Net, fail: bool) -> Result<(), ()> {
            let mut guard = MarkingGuard::new(net);
            guard.place_mut("p1").unwrap().marking = 0;
            if fail {
                return Err(());
            }
            guard.commit();
            Ok(())
        }
        let mut net = sample();
        assert!(drain(&mut net, true).is_err());
        assert_eq!(net.place("p1").unwrap().marking, 3);
        assert!(drain(&mut net, false).is_ok());
        assert_eq!(net.place("p1").unwrap().marking, 0);
    }

    #[test]
    fn commit_keeps_changes() {
        let mut net = sample();
        let mut guard = MarkingGuard::new(&mut net);
        guard.place_mut("p1").unwrap().marking = 0;
        guard.commit();
        assert_eq!(net.place("p1").unwrap().marking, 0);
    }

    #[test]
    fn scoped_snapshot_only_touches_listed_places() {
        let mut net = sample();
        let p1 = PlaceId::from("p1");
        {
            let mut guard = MarkingGuard::scoped(&mut net, [&p1]);
            guard.place_mut("p1").unwrap().marking = 0;
        }
        assert_eq!(net.place("p1").unwrap().marking, 3);
    }
}
