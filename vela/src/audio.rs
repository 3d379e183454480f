//! The audio domain: devices, contexts and the buffers and sources played through them.

use std::thread::LocalKey;

use crate::{
    context::{ContextTracker, Domain},
    Error,
};

mod api;
mod buffer;
mod device;
mod mixer;
mod output;
mod source;

pub use api::{code, AudioApi, SampleFormat, SourceState};
pub use buffer::AudioBuffer;
pub use device::*;
pub use output::SoftwareAudio;
pub use source::{AudioSource, PlaybackState};

/// Marker for the audio domain.
pub enum Audio {}

thread_local! {
    static CURRENT: ContextTracker<Audio> = const { ContextTracker::new() };
}

impl Domain for Audio {
    const NAME: &'static str = "audio";

    type Api = dyn AudioApi;

    fn tracker() -> &'static LocalKey<ContextTracker<Self>> {
        &CURRENT
    }

    // The audio flag holds a single code.
    fn take_error(api: &dyn AudioApi) -> Option<Error> {
        match api.get_error() {
            code::NO_ERROR => None,
            code => Some(Error::native(Self::NAME, api::error_kind(code), code)),
        }
    }
}
