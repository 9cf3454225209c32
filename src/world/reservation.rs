//! Reservation protocol for claimable world entities
//!
//! Only one settler may hold a claim on a resource node or construction site
//! at a time. Claims are taken with `Reservation::acquire`, which wraps a
//! successful `try_reserve` in an owned guard. Dropping the guard releases
//! the claim, so every way a task can end (completion, preemption, death,
//! rejection) releases exactly once.

use std::rc::Rc;

use crate::city::construction::ConstructionSite;
use crate::core::error::{Result, SchedError};
use crate::core::types::{ReservableId, Vec2};
use crate::world::resources::ResourceNode;

/// Capability shared by resource nodes and construction sites
pub trait Reservable {
    fn id(&self) -> ReservableId;

    fn position(&self) -> Vec2;

    /// Claim the entity; false if already claimed or exhausted
    fn try_reserve(&self) -> bool;

    /// Drop the claim. Called by `Reservation` on drop.
    fn release(&self);

    /// Unclaimed and not exhausted
    fn is_available(&self) -> bool;

    /// Depleted node or finished construction site
    fn is_exhausted(&self) -> bool;
}

/// Shared handle to a reservable world entity
#[derive(Debug, Clone)]
pub enum ReservableRef {
    Node(Rc<ResourceNode>),
    Site(Rc<ConstructionSite>),
}

impl ReservableRef {
    fn inner(&self) -> &dyn Reservable {
        match self {
            ReservableRef::Node(node) => node.as_ref(),
            ReservableRef::Site(site) => site.as_ref(),
        }
    }

    pub fn as_node(&self) -> Option<&Rc<ResourceNode>> {
        match self {
            ReservableRef::Node(node) => Some(node),
            ReservableRef::Site(_) => None,
        }
    }

    pub fn as_site(&self) -> Option<&Rc<ConstructionSite>> {
        match self {
            ReservableRef::Site(site) => Some(site),
            ReservableRef::Node(_) => None,
        }
    }

    /// Same underlying world entity
    pub fn same_target(&self, other: &ReservableRef) -> bool {
        match (self, other) {
            (ReservableRef::Node(a), ReservableRef::Node(b)) => Rc::ptr_eq(a, b),
            (ReservableRef::Site(a), ReservableRef::Site(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Reservable for ReservableRef {
    fn id(&self) -> ReservableId {
        self.inner().id()
    }

    fn position(&self) -> Vec2 {
        self.inner().position()
    }

    fn try_reserve(&self) -> bool {
        self.inner().try_reserve()
    }

    fn release(&self) {
        self.inner().release()
    }

    fn is_available(&self) -> bool {
        self.inner().is_available()
    }

    fn is_exhausted(&self) -> bool {
        self.inner().is_exhausted()
    }
}

/// Owned claim on a reservable; releases on drop
#[derive(Debug)]
pub struct Reservation {
    target: ReservableRef,
}

impl Reservation {
    /// Claim `target`, or report the conflict
    pub fn acquire(target: ReservableRef) -> Result<Self> {
        if target.try_reserve() {
            Ok(Self { target })
        } else {
            Err(SchedError::ReservationConflict(target.id()))
        }
    }

    /// Claim the first candidate that accepts, in iteration order
    ///
    /// Callers pass candidates nearest-first so a conflict falls through to
    /// the next-best target.
    pub fn acquire_first<I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = ReservableRef>,
    {
        candidates
            .into_iter()
            .find_map(|candidate| Self::acquire(candidate).ok())
    }

    pub fn target(&self) -> &ReservableRef {
        &self.target
    }

    pub fn id(&self) -> ReservableId {
        self.target.id()
    }

    pub fn position(&self) -> Vec2 {
        self.target.position()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.target.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::resources::ResourceKind;

    fn node(id: u32) -> Rc<ResourceNode> {
        Rc::new(ResourceNode::new(
            ReservableId(id),
            ResourceKind::Wood,
            Vec2::new(id as f32, 0.0),
            3,
        ))
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let tree = node(1);
        let guard = Reservation::acquire(ReservableRef::Node(tree.clone())).unwrap();
        assert!(tree.is_reserved());
        assert_eq!(guard.id(), ReservableId(1));

        drop(guard);
        assert!(!tree.is_reserved());
    }

    #[test]
    fn test_second_acquire_conflicts() {
        let tree = node(1);
        let _held = Reservation::acquire(ReservableRef::Node(tree.clone())).unwrap();
        let err = Reservation::acquire(ReservableRef::Node(tree.clone())).unwrap_err();
        assert!(matches!(err, SchedError::ReservationConflict(ReservableId(1))));
        // The failed attempt must not have released the first claim
        assert!(tree.is_reserved());
    }

    #[test]
    fn test_acquire_first_skips_claimed() {
        let near = node(1);
        let far = node(2);
        let _held = Reservation::acquire(ReservableRef::Node(near.clone())).unwrap();

        let guard = Reservation::acquire_first(vec![
            ReservableRef::Node(near.clone()),
            ReservableRef::Node(far.clone()),
        ])
        .unwrap();
        assert_eq!(guard.id(), ReservableId(2));
    }

    #[test]
    fn test_same_target() {
        let a = node(1);
        let b = node(2);
        let ra = ReservableRef::Node(a.clone());
        assert!(ra.same_target(&ReservableRef::Node(a)));
        assert!(!ra.same_target(&ReservableRef::Node(b)));
    }
}
