//! Handle based wrappers over a native audio api and a native graphics api.
//!
//! Each api family has its own current context per thread. Objects are created through the
//! current context and remember the context (or, for audio buffers, the device) that owns
//! them. Every call on an object is validated against the current context before it reaches
//! the api, and the api's error flag is drained after it.

pub use color::Color;
pub use context::{ContextTracker, CurrentContext, Domain, Uid};
pub use error::{Error, NativeErrorKind, VelaResult};
pub use handle::{Handle, HandleKind, Ownership};
pub use self::image::Image;
pub use os::OsError;

pub use check::Checks;

pub mod audio;
pub mod font;
pub mod graphics;
pub mod sys;

mod check;
mod color;
mod context;
mod error;
mod handle;
mod image;
mod names;
mod os;
