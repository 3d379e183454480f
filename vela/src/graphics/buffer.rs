use bytemuck::Pod;

use crate::{
    check,
    graphics::{
        api::{BufferTarget, BufferUsage, GraphicsApi},
        Graphics,
    },
    handle::{Handle, HandleKind, Ownership},
    VelaResult,
};

pub enum BufferKind {}

impl HandleKind for BufferKind {
    type Domain = Graphics;

    const OWNERSHIP: Ownership = Ownership::Shared;
    const RESOURCE: &'static str = "buffer";

    fn delete(api: &dyn GraphicsApi, name: u32) {
        api.delete_buffer(name);
    }
}

/// A block of graphics memory.
#[derive(Debug, Default)]
pub struct Buffer {
    handle: Handle<BufferKind>,
}

impl Buffer {
    pub fn new() -> VelaResult<Self> {
        let handle = Handle::<BufferKind>::allocate(|api| api.create_buffer())?;
        Ok(Self { handle })
    }

    pub fn with_data<T: Pod>(data: &[T], usage: BufferUsage) -> VelaResult<Self> {
        let buffer = Self::new()?;
        buffer.upload(data, usage)?;
        Ok(buffer)
    }

    /// Replaces the buffer's storage with `data`.
    pub fn upload<T: Pod>(&self, data: &[T], usage: BufferUsage) -> VelaResult {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.handle
            .call(|api, name| api.buffer_data(name, bytes, usage))
    }

    /// Overwrites part of the storage, starting `offset` bytes in.
    pub fn update<T: Pod>(&self, offset: usize, data: &[T]) -> VelaResult {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.handle
            .call(|api, name| api.buffer_sub_data(name, offset, bytes))
    }

    pub fn read(&self) -> VelaResult<Vec<u8>> {
        let mut bytes = vec![0; self.size()?];
        self.read_into(0, &mut bytes)?;
        Ok(bytes)
    }

    pub fn read_into<T: Pod>(&self, offset: usize, out: &mut [T]) -> VelaResult {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(out);
        self.handle
            .call(|api, name| api.read_buffer(name, offset, bytes))
    }

    pub fn size(&self) -> VelaResult<usize> {
        self.handle.call(|api, name| api.buffer_size(name))
    }

    pub fn usage(&self) -> VelaResult<BufferUsage> {
        self.handle.call(|api, name| api.buffer_usage(name))
    }

    pub fn bind(&self, target: BufferTarget) -> VelaResult {
        self.handle.call(|api, name| api.bind_buffer(target, name))
    }

    pub fn unbind(target: BufferTarget) -> VelaResult {
        check::call_current::<Graphics, _>(|api| api.bind_buffer(target, 0))
    }

    /// Asks the api whether this buffer is bound to `target`.
    pub fn is_bound(&self, target: BufferTarget) -> VelaResult<bool> {
        self.handle
            .call(|api, name| api.bound_buffer(target) == name)
    }

    pub fn handle(&self) -> &Handle<BufferKind> {
        &self.handle
    }

    pub fn name(&self) -> u32 {
        self.handle.name()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn take(&mut self) -> Self {
        Self {
            handle: self.handle.take(),
        }
    }

    pub fn destroy(self) -> VelaResult {
        self.handle.destroy()
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::{
        check::Checks,
        graphics::{DriverLimits, GraphicsContext, HeadlessGraphics},
        Error, NativeErrorKind,
    };

    fn current() -> GraphicsContext {
        let ctx = GraphicsContext::headless();
        ctx.make_current(None).unwrap();
        ctx
    }

    #[test]
    fn data_round_trips() {
        let _ctx = current();
        let data = [1.0f32, 2.0, 3.0];

        let buffer = Buffer::with_data(&data, BufferUsage::Static).unwrap();
        buffer.update(4, &[9.0f32]).unwrap();
        let mut out = [0.0f32; 3];
        buffer.read_into(0, &mut out).unwrap();

        assert_eq!([1.0, 9.0, 3.0], out);
        assert_eq!(12, buffer.size().unwrap());
        assert_eq!(BufferUsage::Static, buffer.usage().unwrap());
        assert_eq!(bytemuck::cast_slice::<f32, u8>(&out), buffer.read().unwrap());
    }

    #[test]
    fn binding_is_queried_live() {
        let _ctx = current();
        let a = Buffer::new().unwrap();
        let b = Buffer::new().unwrap();

        a.bind(BufferTarget::Vertex).unwrap();
        assert!(a.is_bound(BufferTarget::Vertex).unwrap());
        assert!(!a.is_bound(BufferTarget::Index).unwrap());

        b.bind(BufferTarget::Vertex).unwrap();
        assert!(!a.is_bound(BufferTarget::Vertex).unwrap());

        Buffer::unbind(BufferTarget::Vertex).unwrap();
        assert!(!b.is_bound(BufferTarget::Vertex).unwrap());
    }

    #[test]
    fn take_leaves_an_empty_buffer() {
        let _ctx = current();
        let mut a = Buffer::with_data(&[1u8, 2], BufferUsage::Static).unwrap();
        let name = a.name();

        let b = a.take();

        assert!(a.is_empty());
        assert_eq!(name, b.name());
        assert_eq!(2, b.size().unwrap());
        assert!(matches!(a.size(), Err(Error::EmptyHandle { .. })));
    }

    #[test]
    fn owner_is_the_creating_context() {
        let ctx = current();

        let buffer = Buffer::new().unwrap();

        assert_eq!(ctx.uid(), buffer.handle().owner());
    }

    #[test]
    fn unrelated_contexts_cannot_use_the_buffer() {
        let a = current();
        let buffer = Buffer::new().unwrap();
        let b = GraphicsContext::headless();
        b.make_current(None).unwrap();

        let result = buffer.size();

        if Checks::OWNERSHIP {
            assert!(matches!(
                result,
                Err(Error::InvalidOwnership { resource: "buffer", .. })
            ));
        }
        a.make_current(None).unwrap();
        assert!(buffer.size().is_ok());
    }

    #[test]
    fn sharing_contexts_can_use_the_buffer() {
        let a = current();
        let buffer = Buffer::with_data(&[7u8], BufferUsage::Static).unwrap();
        let b = a.new_shared();
        b.make_current(None).unwrap();

        assert_eq!(vec![7], buffer.read().unwrap());
    }

    #[test]
    fn nothing_works_without_a_context() {
        let ctx = current();
        let buffer = Buffer::new().unwrap();
        crate::graphics::unset_current();

        assert!(matches!(Buffer::new(), Err(Error::ContextExistence { .. })));
        if Checks::CONTEXT {
            assert!(matches!(
                buffer.size(),
                Err(Error::ContextExistence { .. })
            ));
        }
        ctx.make_current(None).unwrap();
    }

    #[test]
    fn out_of_memory_is_translated() {
        let api = Rc::new(HeadlessGraphics::new(DriverLimits {
            memory_budget: Some(16),
            ..Default::default()
        }));
        let ctx = GraphicsContext::new(api);
        ctx.make_current(None).unwrap();

        let result = Buffer::with_data(&[0u8; 32], BufferUsage::Static);

        if Checks::ERRORS {
            assert_eq!(
                Some(NativeErrorKind::OutOfMemory),
                result.unwrap_err().native_kind()
            );
        }
    }

    #[test]
    fn out_of_range_update_is_invalid_value() {
        let _ctx = current();
        let buffer = Buffer::with_data(&[0u8; 4], BufferUsage::Dynamic).unwrap();

        let result = buffer.update(2, &[0u8; 4]);

        if Checks::ERRORS {
            assert!(matches!(
                result,
                Err(Error::Native { code: 0x0501, .. })
            ));
        }
    }
}
