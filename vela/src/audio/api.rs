use crate::{Error, NativeErrorKind, VelaResult};

/// Native audio error codes, as reported by [`AudioApi::get_error`].
pub mod code {
    pub const NO_ERROR: u32 = 0;
    pub const INVALID_NAME: u32 = 0xA001;
    pub const INVALID_ENUM: u32 = 0xA002;
    pub const INVALID_VALUE: u32 = 0xA003;
    pub const INVALID_OPERATION: u32 = 0xA004;
    pub const OUT_OF_MEMORY: u32 = 0xA005;
}

pub(crate) fn error_kind(code: u32) -> NativeErrorKind {
    match code {
        code::INVALID_NAME => NativeErrorKind::InvalidName,
        code::INVALID_ENUM => NativeErrorKind::InvalidEnum,
        code::INVALID_VALUE => NativeErrorKind::InvalidValue,
        code::INVALID_OPERATION => NativeErrorKind::InvalidOperation,
        code::OUT_OF_MEMORY => NativeErrorKind::OutOfMemory,
        _ => NativeErrorKind::Unknown,
    }
}

/// An object-name based audio api with a sticky error flag.
///
/// Buffers hold sample data and belong to the device. Sources play one buffer each. As with
/// the graphics api, a failing call returns a default value and records an error code.
pub trait AudioApi {
    fn get_error(&self) -> u32;

    // Buffers.
    fn create_buffer(&self) -> u32;
    fn delete_buffer(&self, name: u32);
    fn buffer_data(&self, name: u32, format: SampleFormat, data: &[u8], frequency: u32);
    /// Size of the sample data in bytes.
    fn buffer_size(&self, name: u32) -> usize;
    fn buffer_channels(&self, name: u32) -> u16;
    fn buffer_bits(&self, name: u32) -> u16;
    fn buffer_frequency(&self, name: u32) -> u32;

    // Sources.
    fn create_source(&self) -> u32;
    fn delete_source(&self, name: u32);
    /// Attaches `buffer` to a source that is not playing. Buffer `0` detaches.
    fn set_source_buffer(&self, name: u32, buffer: u32);
    fn source_buffer(&self, name: u32) -> u32;
    /// Starts a source. A playing source restarts from the beginning.
    fn play(&self, name: u32);
    /// Starts a stopped source or resumes a paused one. A playing source carries on.
    fn resume(&self, name: u32);
    /// Pauses a playing source. Has no effect otherwise.
    fn pause(&self, name: u32);
    /// Stops a source and rewinds it.
    fn stop(&self, name: u32);
    fn source_state(&self, name: u32) -> SourceState;
    fn set_sample_offset(&self, name: u32, offset: u32);
    fn sample_offset(&self, name: u32) -> u32;
    fn set_looping(&self, name: u32, looping: bool);
    fn looping(&self, name: u32) -> bool;
    fn set_gain(&self, name: u32, gain: f32);
    fn gain(&self, name: u32) -> f32;
    fn set_pitch(&self, name: u32, pitch: f32);
    fn pitch(&self, name: u32) -> f32;
    fn set_position(&self, name: u32, position: [f32; 3]);
    fn position(&self, name: u32) -> [f32; 3];
}

/// Layout of interleaved sample data. 8-bit samples are unsigned, 16-bit samples are signed
/// little endian.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    Mono8,
    #[default]
    Mono16,
    Stereo8,
    Stereo16,
}

impl SampleFormat {
    pub fn from_layout(channels: u16, bits: u16) -> VelaResult<Self> {
        match (channels, bits) {
            (1, 8) => Ok(Self::Mono8),
            (1, 16) => Ok(Self::Mono16),
            (2, 8) => Ok(Self::Stereo8),
            (2, 16) => Ok(Self::Stereo16),
            (channels, bits) => Err(Error::SampleLayout { channels, bits }),
        }
    }

    pub fn channels(self) -> u16 {
        match self {
            Self::Mono8 | Self::Mono16 => 1,
            Self::Stereo8 | Self::Stereo16 => 2,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::Mono8 | Self::Stereo8 => 8,
            Self::Mono16 | Self::Stereo16 => 16,
        }
    }

    /// Bytes per sample frame, one sample for each channel.
    pub fn frame_size(self) -> usize {
        self.channels() as usize * self.bits() as usize / 8
    }

    /// Decodes the sample of `channel` in the frame starting at `frame[0]` to `[-1, 1]`.
    pub(crate) fn decode(self, frame: &[u8], channel: usize) -> f32 {
        match self.bits() {
            8 => (frame[channel] as f32 - 128.0) / 128.0,
            _ => {
                let at = channel * 2;
                i16::from_le_bytes([frame[at], frame[at + 1]]) as f32 / 32768.0
            }
        }
    }
}

/// Native playback state of a source. Sources start out `Initial`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    #[default]
    Initial,
    Playing,
    Paused,
    Stopped,
}
