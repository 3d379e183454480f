use std::time::Duration;

use crate::{
    audio::{
        api::{AudioApi, SampleFormat},
        Audio,
    },
    handle::{Handle, HandleKind, Ownership},
    VelaResult,
};

pub enum AudioBufferKind {}

// Any context on the device may play a buffer.
impl HandleKind for AudioBufferKind {
    type Domain = Audio;

    const OWNERSHIP: Ownership = Ownership::Device;
    const RESOURCE: &'static str = "buffer";

    fn delete(api: &dyn AudioApi, name: u32) {
        api.delete_buffer(name);
    }
}

/// Decoded sample data held by an audio device.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    handle: Handle<AudioBufferKind>,
}

impl AudioBuffer {
    /// Creates a buffer from interleaved samples laid out as `format`.
    pub fn new(data: &[u8], format: SampleFormat, sample_rate: u32) -> VelaResult<Self> {
        let handle = Handle::<AudioBufferKind>::allocate(|api| api.create_buffer())?;
        handle.call(|api, name| api.buffer_data(name, format, data, sample_rate))?;
        Ok(Self { handle })
    }

    /// Creates a 16-bit buffer from interleaved samples.
    pub fn from_samples(samples: &[i16], channels: u16, sample_rate: u32) -> VelaResult<Self> {
        let format = SampleFormat::from_layout(channels, 16)?;
        let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::new(&data, format, sample_rate)
    }

    pub fn byte_count(&self) -> VelaResult<usize> {
        self.handle.call(|api, name| api.buffer_size(name))
    }

    pub fn channels(&self) -> VelaResult<u16> {
        self.handle.call(|api, name| api.buffer_channels(name))
    }

    pub fn bits(&self) -> VelaResult<u16> {
        self.handle.call(|api, name| api.buffer_bits(name))
    }

    pub fn sample_rate(&self) -> VelaResult<u32> {
        self.handle.call(|api, name| api.buffer_frequency(name))
    }

    /// Number of sample frames, one sample per channel each.
    pub fn sample_count(&self) -> VelaResult<u32> {
        self.handle.call(|api, name| frames(api, name))
    }

    pub fn duration(&self) -> VelaResult<Duration> {
        self.handle
            .call(|api, name| samples_to_time(frames(api, name), api.buffer_frequency(name)))
    }

    pub fn handle(&self) -> &Handle<AudioBufferKind> {
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

pub(crate) fn frames(api: &dyn AudioApi, buffer: u32) -> u32 {
    let frame_size =
        usize::from(api.buffer_channels(buffer)) * usize::from(api.buffer_bits(buffer)) / 8;
    match frame_size {
        0 => 0,
        size => (api.buffer_size(buffer) / size) as u32,
    }
}

pub(crate) fn samples_to_time(samples: u32, sample_rate: u32) -> Duration {
    match sample_rate {
        0 => Duration::ZERO,
        rate => {
            let micros = u128::from(samples) * 1_000_000 / u128::from(rate);
            Duration::from_micros(micros as u64)
        }
    }
}

pub(crate) fn time_to_samples(time: Duration, sample_rate: u32) -> u128 {
    time.as_micros() * u128::from(sample_rate) / 1_000_000
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        audio::{AudioContext, AudioDevice},
        check::Checks,
        Error, NativeErrorKind,
    };

    #[test]
    fn construction_round_trips() {
        let device = AudioDevice::headless();
        let ctx = AudioContext::new(&device);
        ctx.make_current();

        let buffer = AudioBuffer::new(&[0; 16], SampleFormat::Stereo16, 22_050).unwrap();

        assert_eq!(16, buffer.byte_count().unwrap());
        assert_eq!(2, buffer.channels().unwrap());
        assert_eq!(16, buffer.bits().unwrap());
        assert_eq!(22_050, buffer.sample_rate().unwrap());
        assert_eq!(4, buffer.sample_count().unwrap());
    }

    #[test]
    fn from_samples_encodes_little_endian() {
        let device = AudioDevice::headless();
        let ctx = AudioContext::new(&device);
        ctx.make_current();

        let buffer = AudioBuffer::from_samples(&[1, 2, 3, 4], 1, 2).unwrap();

        assert_eq!(8, buffer.byte_count().unwrap());
        assert_eq!(4, buffer.sample_count().unwrap());
        assert_eq!(Duration::from_secs(2), buffer.duration().unwrap());
        assert!(matches!(
            AudioBuffer::from_samples(&[0; 3], 3, 2),
            Err(Error::SampleLayout { channels: 3, .. })
        ));
    }

    #[test]
    fn bad_data_fails_and_releases_the_name() {
        let device = AudioDevice::headless();
        let ctx = AudioContext::new(&device);
        ctx.make_current();

        let result = AudioBuffer::new(&[0; 3], SampleFormat::Mono16, 44_100);

        if Checks::ERRORS {
            assert_eq!(
                Some(NativeErrorKind::InvalidValue),
                result.unwrap_err().native_kind()
            );
        }
    }

    #[test]
    fn buffers_follow_the_device_not_the_context() {
        let device = AudioDevice::headless();
        let a = AudioContext::new(&device);
        let b = AudioContext::new(&device);
        a.make_current();
        let buffer = AudioBuffer::new(&[0; 4], SampleFormat::Mono8, 8_000).unwrap();

        b.make_current();
        assert_eq!(4, buffer.byte_count().unwrap());
        assert_eq!(device.uid(), buffer.handle().owner());

        let other = AudioDevice::headless();
        let c = AudioContext::new(&other);
        c.make_current();
        if Checks::OWNERSHIP {
            assert!(matches!(
                buffer.byte_count(),
                Err(Error::InvalidOwnership { .. })
            ));
        }
        b.make_current();
    }

    #[test]
    fn creating_without_a_context_fails() {
        crate::audio::unset_current();

        let result = AudioBuffer::new(&[0; 4], SampleFormat::Mono8, 8_000);

        assert!(matches!(result, Err(Error::ContextExistence { domain: "audio" })));
    }

    #[test]
    fn time_conversions() {
        assert_eq!(Duration::from_micros(1_500_000), samples_to_time(3, 2));
        assert_eq!(Duration::ZERO, samples_to_time(3, 0));
        assert_eq!(3, time_to_samples(Duration::from_micros(1_500_000), 2));
    }
}
