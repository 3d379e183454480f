use crate::{
    check,
    context::Domain,
    graphics::{
        api::{AttributeBinding, BufferTarget, GraphicsApi, VertexAttribute},
        buffer::{Buffer, BufferKind},
        Graphics,
    },
    handle::{Handle, HandleKind, Ownership},
    Error, VelaResult,
};

pub enum VertexArrayKind {}

// Container objects are never shared between contexts.
impl HandleKind for VertexArrayKind {
    type Domain = Graphics;

    const OWNERSHIP: Ownership = Ownership::Exclusive;
    const RESOURCE: &'static str = "vertex array";

    fn delete(api: &dyn GraphicsApi, name: u32) {
        api.delete_vertex_array(name);
    }
}

/// Vertex attribute layout and the buffers each attribute reads from.
#[derive(Debug, Default)]
pub struct VertexArray {
    handle: Handle<VertexArrayKind>,
}

impl VertexArray {
    pub fn new() -> VelaResult<Self> {
        let handle = Handle::<VertexArrayKind>::allocate(|api| api.create_vertex_array())?;
        Ok(Self { handle })
    }

    pub fn bind(&self) -> VelaResult {
        self.handle.call(|api, name| api.bind_vertex_array(name))
    }

    pub fn unbind() -> VelaResult {
        check::call_current::<Graphics, _>(|api| api.bind_vertex_array(0))
    }

    pub fn is_bound(&self) -> VelaResult<bool> {
        self.handle
            .call(|api, name| api.bound_vertex_array() == name)
    }

    /// Reads attribute `index` from `buffer` with the given layout. Bindings are left as they
    /// were.
    pub fn set_attribute(
        &self,
        index: u32,
        buffer: &Buffer,
        layout: VertexAttribute,
    ) -> VelaResult {
        if buffer.is_empty() {
            return Err(Error::EmptyHandle {
                domain: Graphics::NAME,
                resource: BufferKind::RESOURCE,
            });
        }
        buffer.handle().check_ownership()?;

        let buffer = buffer.name();
        self.with_bound(|api| {
            let previous = api.bound_buffer(BufferTarget::Vertex);
            api.bind_buffer(BufferTarget::Vertex, buffer);
            api.vertex_attribute(index, layout);
            api.bind_buffer(BufferTarget::Vertex, previous);
        })
    }

    pub fn enable(&self, index: u32) -> VelaResult {
        self.with_bound(|api| api.set_attribute_enabled(index, true))
    }

    pub fn disable(&self, index: u32) -> VelaResult {
        self.with_bound(|api| api.set_attribute_enabled(index, false))
    }

    pub fn attribute(&self, index: u32) -> VelaResult<Option<AttributeBinding>> {
        self.with_bound(|api| api.attribute_binding(index))
    }

    fn with_bound<R>(&self, f: impl FnOnce(&dyn GraphicsApi) -> R) -> VelaResult<R> {
        self.handle.call(|api, name| {
            let previous = api.bound_vertex_array();
            api.bind_vertex_array(name);
            let result = f(api);
            api.bind_vertex_array(previous);
            result
        })
    }

    pub fn handle(&self) -> &Handle<VertexArrayKind> {
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
