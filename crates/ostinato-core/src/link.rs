//! Linked groups: handles whose start/stop/prepare triggers fire
//! together.
//!
//! Membership is a symmetric equivalence class. Joining two handles
//! merges their groups; a member that unlinks falls back to a singleton
//! group. Triggers iterate the group under its lock, so linked members
//! transition atomically with respect to each other.

use crate::error::Result;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A stream that can participate in a linked group. The `local_*` ops
/// perform the member's own transition without re-entering the group.
pub trait Linkable: Send + Sync {
    fn local_prepare(&self) -> Result<()>;
    fn local_start(&self) -> Result<()>;
    fn local_stop(&self) -> Result<()>;
    fn group(&self) -> Arc<LinkGroup>;
    fn set_group(&self, group: Arc<LinkGroup>);
}

/// The shared trigger group.
pub struct LinkGroup {
    members: Mutex<Vec<Weak<dyn Linkable>>>,
}

impl LinkGroup {
    /// A fresh group containing only `member`.
    pub fn singleton(member: Weak<dyn Linkable>) -> Arc<LinkGroup> {
        Arc::new(LinkGroup {
            members: Mutex::new(vec![member]),
        })
    }

    pub fn len(&self) -> usize {
        self.members.lock().iter().filter(|m| m.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` on every live member, holding the group lock so the
    /// trigger is atomic across members. The first error aborts.
    pub fn trigger(&self, f: impl Fn(&dyn Linkable) -> Result<()>) -> Result<()> {
        let members = self.members.lock();
        for weak in members.iter() {
            if let Some(member) = weak.upgrade() {
                f(member.as_ref())?;
            }
        }
        Ok(())
    }
}

/// The link descriptor a back-end surfaces for its stream.
#[derive(Clone)]
pub struct LinkHandle {
    member: Arc<dyn Linkable>,
}

impl LinkHandle {
    pub fn new(member: Arc<dyn Linkable>) -> LinkHandle {
        LinkHandle { member }
    }

    /// Whether this stream currently shares its group with another.
    pub fn is_linked(&self) -> bool {
        self.member.group().len() > 1
    }

    /// Merge this stream's group into `other`'s. Transitive: every
    /// member of this group moves over.
    pub fn join(&self, other: &LinkHandle) -> Result<()> {
        let from = self.member.group();
        let to = other.member.group();
        if Arc::ptr_eq(&from, &to) {
            return Ok(());
        }
        let moved: Vec<Weak<dyn Linkable>> = std::mem::take(&mut *from.members.lock());
        let mut members = to.members.lock();
        for weak in moved {
            if let Some(member) = weak.upgrade() {
                member.set_group(to.clone());
                members.push(Arc::downgrade(&member));
            }
        }
        Ok(())
    }

    /// Leave the current group; this stream triggers alone afterwards.
    pub fn unlink(&self) {
        let group = self.member.group();
        {
            let mut members = group.members.lock();
            members.retain(|weak| {
                weak.upgrade()
                    .map(|m| !Arc::ptr_eq(&m, &self.member))
                    .unwrap_or(false)
            });
        }
        self.member
            .set_group(LinkGroup::singleton(Arc::downgrade(&self.member)));
    }
}
