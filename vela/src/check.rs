//! Validation run around every native call made through a handle.
//!
//! Each check can be compiled out independently. They are on in debug builds and in release
//! builds that enable the matching `check-*` feature.

use crate::{
    context::{self, Binding, Domain},
    handle::HandleKind,
    Error, VelaResult,
};

pub struct Checks;

impl Checks {
    /// Reject handle operations when no context of the handle's domain is current.
    pub const CONTEXT: bool = cfg!(any(debug_assertions, feature = "check-context"));
    /// Reject handle operations when the current context may not use the handle.
    pub const OWNERSHIP: bool = cfg!(any(debug_assertions, feature = "check-ownership"));
    /// Drain the native error flag after each call and report what was found.
    pub const ERRORS: bool = cfg!(any(debug_assertions, feature = "check-errors"));
}

/// The current binding of `D`, or an error when none is set and the check is enabled.
pub(crate) fn context_existence<D: Domain>() -> VelaResult<Option<Binding<D>>> {
    let binding = context::binding::<D>();
    if Checks::CONTEXT && binding.is_none() {
        return Err(Error::ContextExistence { domain: D::NAME });
    }

    Ok(binding)
}

pub(crate) fn context_ownership<K: HandleKind>(
    binding: Option<&Binding<K::Domain>>,
    name: u32,
    owner: context::Uid,
) -> VelaResult {
    if !Checks::OWNERSHIP {
        return Ok(());
    }

    match binding {
        Some(binding) if !binding.admits(K::OWNERSHIP, owner) => Err(Error::InvalidOwnership {
            domain: <K::Domain as Domain>::NAME,
            resource: K::RESOURCE,
            name,
            owner,
            current: binding.context,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn native_error<D: Domain>(api: &D::Api) -> VelaResult {
    if !Checks::ERRORS {
        return Ok(());
    }

    match D::take_error(api) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Runs `f` against the current context's api. Used by operations that target the context
/// itself rather than an object in it.
pub(crate) fn call_current<D: Domain, R>(f: impl FnOnce(&D::Api) -> R) -> VelaResult<R> {
    let binding = context::binding::<D>().ok_or(Error::ContextExistence { domain: D::NAME })?;
    let result = f(&binding.api);
    native_error::<D>(&binding.api)?;

    Ok(result)
}
