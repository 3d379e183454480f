//! Per-thread tracking of the current context of each api domain.
//!
//! Every domain (audio, graphics) owns one [`ContextTracker`] per thread. Handle
//! construction stamps its owner from the tracker and every handle operation is
//! validated against it.

use std::{
    cell::RefCell,
    fmt::Display,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
    thread::LocalKey,
};

use crate::{handle::Ownership, Error};

/// Process-unique identifier of a device, context or window. Never zero once allocated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(u64);

impl Uid {
    pub const NONE: Self = Self(0);

    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A native api family whose contexts are tracked independently of the others.
pub trait Domain: Sized + 'static {
    const NAME: &'static str;

    type Api: ?Sized + 'static;

    fn tracker() -> &'static LocalKey<ContextTracker<Self>>;

    /// Drains the api's sticky error flag, translating the first error found.
    fn take_error(api: &Self::Api) -> Option<Error>;
}

/// Contexts that may use each other's shared objects.
#[derive(Debug, Default)]
pub struct ShareGroup {
    members: RefCell<Vec<Uid>>,
}

impl ShareGroup {
    pub(crate) fn new(first: Uid) -> Rc<Self> {
        Rc::new(Self {
            members: RefCell::new(vec![first]),
        })
    }

    // Members are never removed: shared objects outlive the context that created them.
    pub(crate) fn join(&self, context: Uid) {
        let mut members = self.members.borrow_mut();
        if !members.contains(&context) {
            members.push(context);
        }
    }

    pub fn contains(&self, context: Uid) -> bool {
        self.members.borrow().contains(&context)
    }
}

pub struct Binding<D: Domain> {
    pub(crate) context: Uid,
    pub(crate) device: Uid,
    pub(crate) share_group: Rc<ShareGroup>,
    pub(crate) api: Rc<D::Api>,
}

impl<D: Domain> Binding<D> {
    pub(crate) fn admits(&self, ownership: Ownership, owner: Uid) -> bool {
        match ownership {
            Ownership::Device => owner == self.device,
            Ownership::Shared => owner == self.context || self.share_group.contains(owner),
            Ownership::Exclusive => owner == self.context,
        }
    }
}

impl<D: Domain> Clone for Binding<D> {
    fn clone(&self) -> Self {
        Self {
            context: self.context,
            device: self.device,
            share_group: self.share_group.clone(),
            api: self.api.clone(),
        }
    }
}

/// Identity of the context that is current on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrentContext {
    pub context: Uid,
    pub device: Uid,
}

pub struct ContextTracker<D: Domain> {
    current: RefCell<Option<Binding<D>>>,
}

impl<D: Domain> ContextTracker<D> {
    pub const fn new() -> Self {
        Self {
            current: RefCell::new(None),
        }
    }

    pub(crate) fn set(&self, binding: Binding<D>) {
        // Dropped outside the borrow.
        let _previous = self.current.replace(Some(binding));
    }

    pub(crate) fn unset(&self) {
        let _previous = self.current.take();
    }

    pub(crate) fn binding(&self) -> Option<Binding<D>> {
        self.current.borrow().clone()
    }

    pub fn current(&self) -> Option<CurrentContext> {
        self.current.borrow().as_ref().map(|b| CurrentContext {
            context: b.context,
            device: b.device,
        })
    }

    pub fn is_current(&self, context: Uid) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|b| b.context == context)
    }

    pub fn is_set(&self) -> bool {
        self.current.borrow().is_some()
    }
}

impl<D: Domain> Default for ContextTracker<D> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn set_current<D: Domain>(binding: Binding<D>) {
    log::debug!("{} context {} is now current", D::NAME, binding.context);
    D::tracker().with(|tracker| tracker.set(binding));
}

pub(crate) fn unset_current<D: Domain>() {
    // The tracker may already be gone when a context is dropped during thread teardown.
    let _ = D::tracker().try_with(|tracker| tracker.unset());
}

pub(crate) fn binding<D: Domain>() -> Option<Binding<D>> {
    D::tracker()
        .try_with(|tracker| tracker.binding())
        .ok()
        .flatten()
}

pub fn current<D: Domain>() -> Option<CurrentContext> {
    D::tracker()
        .try_with(|tracker| tracker.current())
        .ok()
        .flatten()
}

pub fn is_current<D: Domain>(context: Uid) -> bool {
    D::tracker()
        .try_with(|tracker| tracker.is_current(context))
        .unwrap_or(false)
}

pub fn has_current<D: Domain>() -> bool {
    D::tracker()
        .try_with(|tracker| tracker.is_set())
        .unwrap_or(false)
}
