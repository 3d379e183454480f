use std::rc::Rc;

use crate::{
    check,
    context::{self, Binding, CurrentContext, ShareGroup, Uid},
    graphics::{
        api::{code, error_kind, GraphicsApi},
        gpu::{GpuConfig, WgpuGraphics},
        headless::HeadlessGraphics,
        Graphics,
    },
    sys::Window,
    Color, Error, VelaResult,
};

/// A connection to a graphics api.
///
/// Contexts created with [`new_shared`](Self::new_shared) share one native namespace and may
/// use each other's buffers, textures, shaders and programs.
pub struct GraphicsContext {
    uid: Uid,
    device: Uid,
    share_group: Rc<ShareGroup>,
    api: Rc<dyn GraphicsApi>,
}

impl GraphicsContext {
    pub fn new(api: Rc<dyn GraphicsApi>) -> Self {
        let uid = Uid::next();
        log::debug!("created graphics context {uid}");

        Self {
            uid,
            device: uid,
            share_group: ShareGroup::new(uid),
            api,
        }
    }

    pub fn headless() -> Self {
        Self::new(Rc::new(HeadlessGraphics::default()))
    }

    pub fn gpu(config: &GpuConfig) -> VelaResult<Self> {
        Ok(Self::new(Rc::new(WgpuGraphics::new(config)?)))
    }

    /// A new context in this context's share group.
    pub fn new_shared(&self) -> Self {
        let uid = Uid::next();
        self.share_group.join(uid);
        log::debug!("created graphics context {uid} sharing with {}", self.uid);

        Self {
            uid,
            device: self.device,
            share_group: self.share_group.clone(),
            api: self.api.clone(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn api(&self) -> &Rc<dyn GraphicsApi> {
        &self.api
    }

    pub fn shares_with(&self, other: &GraphicsContext) -> bool {
        self.share_group.contains(other.uid)
    }

    /// Makes this the current graphics context of the calling thread, optionally targeting
    /// `window`.
    pub fn make_current(&self, window: Option<&Window>) -> VelaResult {
        self.api.make_current(self.uid, window);
        check::native_error::<Graphics>(&*self.api)?;

        context::set_current::<Graphics>(Binding {
            context: self.uid,
            device: self.device,
            share_group: self.share_group.clone(),
            api: self.api.clone(),
        });

        Ok(())
    }

    pub fn is_current(&self) -> bool {
        context::is_current::<Graphics>(self.uid)
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        if self.is_current() {
            context::unset_current::<Graphics>();
        }
        self.api.release_context(self.uid);
        log::debug!("destroyed graphics context {}", self.uid);
    }
}

pub fn set_current(context: &GraphicsContext, window: Option<&Window>) -> VelaResult {
    context.make_current(window)
}

/// Retargets the current context at `window`.
///
/// Fails with an invalid operation error when no graphics context is current.
pub fn set_window(window: &Window) -> VelaResult {
    let Some(current) = context::current::<Graphics>() else {
        let code = code::INVALID_OPERATION;
        return Err(Error::native(
            <Graphics as context::Domain>::NAME,
            error_kind(code),
            code,
        ));
    };

    check::call_current::<Graphics, _>(|api| api.make_current(current.context, Some(window)))
}

pub fn unset_current() {
    log::debug!("no graphics context is current");
    context::unset_current::<Graphics>();
}

pub fn current() -> Option<CurrentContext> {
    context::current::<Graphics>()
}

pub fn is_current(context: &GraphicsContext) -> bool {
    context.is_current()
}

/// Clears the current context's window.
pub fn clear(color: Color) -> VelaResult {
    check::call_current::<Graphics, _>(|api| api.clear(color))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::NativeErrorKind;

    #[test]
    fn set_window_requires_a_current_context() {
        let window = Window::offscreen(8, 8);

        let result = set_window(&window);

        assert_eq!(
            Some(NativeErrorKind::InvalidOperation),
            result.unwrap_err().native_kind()
        );
    }

    #[test]
    fn set_window_retargets_the_current_context() {
        let headless = Rc::new(HeadlessGraphics::default());
        let ctx = GraphicsContext::new(headless.clone());
        let first = Window::offscreen(8, 8);
        let second = Window::offscreen(8, 8);

        set_current(&ctx, Some(&first)).unwrap();
        assert_eq!(Some(first.id()), headless.window());

        set_window(&second).unwrap();
        assert_eq!(Some(second.id()), headless.window());
        assert!(ctx.is_current());
    }

    #[test]
    fn current_reports_the_context() {
        let ctx = GraphicsContext::headless();
        ctx.make_current(None).unwrap();

        assert_eq!(Some(ctx.uid()), current().map(|c| c.context));
        assert!(is_current(&ctx));

        unset_current();
        assert_eq!(None, current());
        assert!(!ctx.is_current());
    }

    #[test]
    fn dropping_the_current_context_unsets_it() {
        let ctx = GraphicsContext::headless();
        ctx.make_current(None).unwrap();

        drop(ctx);

        assert_eq!(None, current());
    }

    #[test]
    fn dropping_another_context_keeps_the_current_one() {
        let a = GraphicsContext::headless();
        let b = GraphicsContext::headless();
        a.make_current(None).unwrap();

        drop(b);

        assert!(a.is_current());
    }

    #[test]
    fn shared_contexts_share_the_api() {
        let a = GraphicsContext::headless();
        let b = a.new_shared();
        let c = GraphicsContext::headless();

        assert!(Rc::ptr_eq(a.api(), b.api()));
        assert!(a.shares_with(&b));
        assert!(b.shares_with(&a));
        assert!(!a.shares_with(&c));
    }

    #[test]
    fn clear_goes_to_the_current_context() {
        let headless = Rc::new(HeadlessGraphics::default());
        let ctx = GraphicsContext::new(headless.clone());

        assert!(matches!(
            clear(Color::RED),
            Err(Error::ContextExistence { .. })
        ));

        ctx.make_current(None).unwrap();
        clear(Color::RED).unwrap();

        assert_eq!(Some(Color::RED), headless.clear_color());
    }
}
