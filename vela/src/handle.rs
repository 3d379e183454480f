use std::{marker::PhantomData, mem, rc::Rc};

use crate::{
    check,
    context::{self, Domain, Uid},
    Error, VelaResult,
};

/// Which contexts may use an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Usable from any context created on the owning device.
    Device,
    /// Usable from the owning context and every context that shares with it.
    Shared,
    /// Usable only from the owning context.
    Exclusive,
}

pub trait HandleKind: 'static {
    type Domain: Domain;

    const OWNERSHIP: Ownership;
    const RESOURCE: &'static str;

    fn delete(api: &<Self::Domain as Domain>::Api, name: u32);
}

type Api<K> = <<K as HandleKind>::Domain as Domain>::Api;

/// A native object name stamped with the uid of the context or device that owns it.
///
/// Handles are moved, never copied. Dropping a live handle deletes the object when the current
/// context is allowed to. Otherwise the object is leaked and the reason is logged.
pub struct Handle<K: HandleKind> {
    name: u32,
    owner: Uid,
    api: Option<Rc<Api<K>>>,
    _kind: PhantomData<K>,
}

impl<K: HandleKind> Handle<K> {
    pub fn empty() -> Self {
        Self {
            name: 0,
            owner: Uid::NONE,
            api: None,
            _kind: PhantomData,
        }
    }

    /// Creates an object through the current context and stamps its owner.
    pub(crate) fn allocate(create: impl FnOnce(&Api<K>) -> u32) -> VelaResult<Self> {
        let domain = <K::Domain as Domain>::NAME;
        let binding =
            context::binding::<K::Domain>().ok_or(Error::ContextExistence { domain })?;

        let name = create(&binding.api);
        if let Err(err) = check::native_error::<K::Domain>(&binding.api) {
            if name != 0 {
                K::delete(&binding.api, name);
            }
            return Err(err);
        }
        if name == 0 {
            return Err(Error::Allocation {
                domain,
                resource: K::RESOURCE,
            });
        }

        let owner = match K::OWNERSHIP {
            Ownership::Device => binding.device,
            Ownership::Shared | Ownership::Exclusive => binding.context,
        };
        log::debug!("created {domain} {} {name} owned by {owner}", K::RESOURCE);

        Ok(Self {
            name,
            owner,
            api: Some(binding.api),
            _kind: PhantomData,
        })
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    pub fn owner(&self) -> Uid {
        self.owner
    }

    pub fn is_empty(&self) -> bool {
        self.name == 0
    }

    /// Moves the object out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }

    /// Checks that a context is current and that it may use this handle.
    pub fn check_ownership(&self) -> VelaResult {
        let binding = check::context_existence::<K::Domain>()?;
        check::context_ownership::<K>(binding.as_ref(), self.name, self.owner)
    }

    /// Runs a native call on this object after validating the current context.
    pub(crate) fn call<R>(&self, f: impl FnOnce(&Api<K>, u32) -> R) -> VelaResult<R> {
        let api = match &self.api {
            Some(api) if self.name != 0 => api,
            _ => {
                return Err(Error::EmptyHandle {
                    domain: <K::Domain as Domain>::NAME,
                    resource: K::RESOURCE,
                })
            }
        };

        self.check_ownership()?;
        let result = f(api, self.name);
        check::native_error::<K::Domain>(api)?;

        Ok(result)
    }

    /// Deletes the object now, reporting why it could not be deleted.
    ///
    /// The handle is consumed either way: an object that fails validation is leaked.
    pub fn destroy(mut self) -> VelaResult {
        self.release()
    }

    fn release(&mut self) -> VelaResult {
        let Some(api) = self.api.take() else {
            return Ok(());
        };
        let name = mem::take(&mut self.name);

        let binding = check::context_existence::<K::Domain>()?;
        check::context_ownership::<K>(binding.as_ref(), name, self.owner)?;

        K::delete(&api, name);
        log::debug!(
            "deleted {} {} {name}",
            <K::Domain as Domain>::NAME,
            K::RESOURCE
        );

        check::native_error::<K::Domain>(&api)
    }
}

impl<K: HandleKind> Default for Handle<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: HandleKind> std::fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("resource", &K::RESOURCE)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .finish()
    }
}

impl<K: HandleKind> Drop for Handle<K> {
    fn drop(&mut self) {
        let name = self.name;
        match self.release() {
            Ok(()) => {}
            Err(err @ Error::ContextExistence { .. }) => {
                log::warn!("leaking {} {name}: {err}", K::RESOURCE)
            }
            Err(err) => log::error!("failed to delete {} {name}: {err}", K::RESOURCE),
        }
    }
}
