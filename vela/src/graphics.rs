//! The graphics domain: contexts, the native api and the objects created through it.

use std::thread::LocalKey;

use crate::{
    context::{ContextTracker, Domain},
    Error,
};

mod api;
mod buffer;
mod context;
mod driver;
mod gpu;
mod headless;
mod mip;
mod shader;
mod texture;
mod vertex_array;

pub use api::*;
pub use buffer::Buffer;
pub use context::*;
pub use driver::DriverLimits;
pub use gpu::{GpuConfig, WgpuGraphics};
pub use headless::HeadlessGraphics;
pub use shader::{Program, Shader};
pub use texture::Texture;
pub use vertex_array::VertexArray;

/// Marker for the graphics domain.
pub enum Graphics {}

thread_local! {
    static CURRENT: ContextTracker<Graphics> = const { ContextTracker::new() };
}

// A native api may queue several errors; more than this means the flag never clears.
const MAX_QUEUED_ERRORS: usize = 8;

impl Domain for Graphics {
    const NAME: &'static str = "graphics";

    type Api = dyn GraphicsApi;

    fn tracker() -> &'static LocalKey<ContextTracker<Self>> {
        &CURRENT
    }

    fn take_error(api: &dyn GraphicsApi) -> Option<Error> {
        let mut first = None;
        for _ in 0..MAX_QUEUED_ERRORS {
            match api.get_error() {
                code::NO_ERROR => break,
                code => {
                    first.get_or_insert(code);
                }
            }
        }

        first.map(|code| Error::native(Self::NAME, api::error_kind(code), code))
    }
}
