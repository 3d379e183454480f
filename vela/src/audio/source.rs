use std::time::Duration;

use glam::Vec3;

use crate::{
    audio::{
        api::{AudioApi, SourceState},
        buffer::{self, AudioBuffer, AudioBufferKind},
        Audio,
    },
    context::Domain,
    handle::{Handle, HandleKind, Ownership},
    Error, VelaResult,
};

pub enum AudioSourceKind {}

impl HandleKind for AudioSourceKind {
    type Domain = Audio;

    const OWNERSHIP: Ownership = Ownership::Exclusive;
    const RESOURCE: &'static str = "source";

    fn delete(api: &dyn AudioApi, name: u32) {
        api.delete_source(name);
    }
}

/// Playback state of an [`AudioSource`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl From<SourceState> for PlaybackState {
    fn from(state: SourceState) -> Self {
        match state {
            SourceState::Initial | SourceState::Stopped => Self::Stopped,
            SourceState::Playing => Self::Playing,
            SourceState::Paused => Self::Paused,
        }
    }
}

/// Plays an [`AudioBuffer`].
///
/// The state is read from the device on every query, so a source that reaches the end of a
/// non-looping buffer reports [`PlaybackState::Stopped`] without being told.
#[derive(Debug, Default)]
pub struct AudioSource {
    handle: Handle<AudioSourceKind>,
}

impl AudioSource {
    pub fn new() -> VelaResult<Self> {
        let handle = Handle::<AudioSourceKind>::allocate(|api| api.create_source())?;
        Ok(Self { handle })
    }

    pub fn with_buffer(buffer: &AudioBuffer) -> VelaResult<Self> {
        let source = Self::new()?;
        source.set_buffer(buffer)?;
        Ok(source)
    }

    /// Stops the source and attaches `buffer`.
    pub fn set_buffer(&self, buffer: &AudioBuffer) -> VelaResult {
        if buffer.is_empty() {
            return Err(Error::EmptyHandle {
                domain: Audio::NAME,
                resource: AudioBufferKind::RESOURCE,
            });
        }
        buffer.handle().check_ownership()?;

        let buffer = buffer.name();
        self.handle.call(|api, name| {
            api.stop(name);
            api.set_source_buffer(name, buffer);
        })
    }

    /// Stops the source and detaches its buffer.
    pub fn clear_buffer(&self) -> VelaResult {
        self.handle.call(|api, name| {
            api.stop(name);
            api.set_source_buffer(name, 0);
        })
    }

    pub fn has_buffer(&self) -> VelaResult<bool> {
        self.handle.call(|api, name| api.source_buffer(name) != 0)
    }

    pub fn state(&self) -> VelaResult<PlaybackState> {
        self.handle
            .call(|api, name| api.source_state(name).into())
    }

    pub fn is_playing(&self) -> VelaResult<bool> {
        Ok(self.state()? == PlaybackState::Playing)
    }

    /// Starts or resumes playback. A source that is already playing carries on.
    pub fn play(&self) -> VelaResult {
        self.handle.call(|api, name| api.resume(name))
    }

    /// Pauses a playing source. Has no effect otherwise.
    pub fn pause(&self) -> VelaResult {
        self.handle.call(|api, name| api.pause(name))
    }

    /// Stops playback and rewinds to the first sample.
    pub fn stop(&self) -> VelaResult {
        self.handle.call(|api, name| api.stop(name))
    }

    /// Plays from the first sample, whatever the current state.
    pub fn replay(&self) -> VelaResult {
        self.handle.call(|api, name| {
            api.stop(name);
            api.play(name);
        })
    }

    pub fn set_looping(&self, looping: bool) -> VelaResult {
        self.handle
            .call(|api, name| api.set_looping(name, looping))
    }

    pub fn is_looping(&self) -> VelaResult<bool> {
        self.handle.call(|api, name| api.looping(name))
    }

    /// Moves playback to sample frame `position`, wrapped to the length of the buffer.
    pub fn set_sample_pos(&self, position: u32) -> VelaResult {
        self.handle.call(|api, name| {
            let (frames, _) = layout(api, name);
            let wrapped = match frames {
                0 => 0,
                frames => position % frames,
            };
            api.set_sample_offset(name, wrapped);
        })
    }

    pub fn sample_pos(&self) -> VelaResult<u32> {
        self.handle.call(|api, name| api.sample_offset(name))
    }

    /// Moves playback to `time`, wrapped to the length of the buffer.
    pub fn set_time_pos(&self, time: Duration) -> VelaResult {
        self.handle.call(|api, name| {
            let (frames, rate) = layout(api, name);
            let wrapped = match frames {
                0 => 0,
                frames => (buffer::time_to_samples(time, rate) % u128::from(frames)) as u32,
            };
            api.set_sample_offset(name, wrapped);
        })
    }

    pub fn time_pos(&self) -> VelaResult<Duration> {
        self.handle.call(|api, name| {
            let (_, rate) = layout(api, name);
            buffer::samples_to_time(api.sample_offset(name), rate)
        })
    }

    pub fn set_gain(&self, gain: f32) -> VelaResult {
        self.handle.call(|api, name| api.set_gain(name, gain))
    }

    pub fn gain(&self) -> VelaResult<f32> {
        self.handle.call(|api, name| api.gain(name))
    }

    pub fn set_pitch(&self, pitch: f32) -> VelaResult {
        self.handle.call(|api, name| api.set_pitch(name, pitch))
    }

    pub fn pitch(&self) -> VelaResult<f32> {
        self.handle.call(|api, name| api.pitch(name))
    }

    pub fn set_position(&self, position: Vec3) -> VelaResult {
        self.handle
            .call(|api, name| api.set_position(name, position.to_array()))
    }

    pub fn position(&self) -> VelaResult<Vec3> {
        self.handle
            .call(|api, name| Vec3::from_array(api.position(name)))
    }

    pub fn handle(&self) -> &Handle<AudioSourceKind> {
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

/// Frame count and sample rate of the attached buffer, zeroes when there is none.
fn layout(api: &dyn AudioApi, source: u32) -> (u32, u32) {
    match api.source_buffer(source) {
        0 => (0, 0),
        buffer => (buffer::frames(api, buffer), api.buffer_frequency(buffer)),
    }
}
