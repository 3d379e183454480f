use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{
    audio::{
        api::{AudioApi, SampleFormat, SourceState},
        mixer::Mixer,
    },
    Error, VelaResult,
};

/// The audio api on a software mixer.
///
/// The mixer either feeds the default output device through cpal or, when headless, is only
/// advanced by calls to [`render`](Self::render).
pub struct SoftwareAudio {
    mixer: Arc<Mutex<Mixer>>,
    stream: Option<cpal::Stream>,
}

impl SoftwareAudio {
    pub fn headless(sample_rate: u32, channels: u16) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate, channels))),
            stream: None,
        }
    }

    /// Plays through the host's default output device.
    pub fn open_default() -> VelaResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no default output device available".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|err| Error::AudioOutput(err.to_string()))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::AudioOutput(format!(
                "unsupported sample format: {}",
                config.sample_format()
            )));
        }

        let sample_rate: u32 = config.sample_rate();
        let channels = config.channels();
        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, channels)));

        let output = mixer.clone();
        let stream = device
            .build_output_stream(
                &config.config(),
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    output
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .render(out)
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|err| Error::AudioOutput(err.to_string()))?;
        stream
            .play()
            .map_err(|err| Error::AudioOutput(err.to_string()))?;

        log::debug!("audio output at {sample_rate} Hz with {channels} channels");

        Ok(Self {
            mixer,
            stream: Some(stream),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer().rate()
    }

    pub fn channels(&self) -> u16 {
        self.mixer().channels()
    }

    pub fn is_headless(&self) -> bool {
        self.stream.is_none()
    }

    /// Mixes the next frames into `out`. Only useful when headless: an output stream
    /// renders on its own.
    pub fn render(&self, out: &mut [f32]) {
        self.mixer().render(out);
    }

    fn mixer(&self) -> MutexGuard<'_, Mixer> {
        // The mixer holds no invariant a panicking render could break.
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<T: Default>(&self, f: impl FnOnce(&mut Mixer) -> Result<T, u32>) -> T {
        self.mixer().run(f)
    }
}

impl AudioApi for SoftwareAudio {
    fn get_error(&self) -> u32 {
        self.mixer().take_error()
    }

    fn create_buffer(&self) -> u32 {
        self.run(|m| m.create_buffer())
    }

    fn delete_buffer(&self, name: u32) {
        self.run(|m| m.delete_buffer(name))
    }

    fn buffer_data(&self, name: u32, format: SampleFormat, data: &[u8], frequency: u32) {
        self.run(|m| m.buffer_data(name, format, data, frequency))
    }

    fn buffer_size(&self, name: u32) -> usize {
        self.run(|m| m.buffer_size(name))
    }

    fn buffer_channels(&self, name: u32) -> u16 {
        self.run(|m| m.buffer_format(name).map(SampleFormat::channels))
    }

    fn buffer_bits(&self, name: u32) -> u16 {
        self.run(|m| m.buffer_format(name).map(SampleFormat::bits))
    }

    fn buffer_frequency(&self, name: u32) -> u32 {
        self.run(|m| m.buffer_frequency(name))
    }

    fn create_source(&self) -> u32 {
        self.run(|m| m.create_source())
    }

    fn delete_source(&self, name: u32) {
        self.run(|m| m.delete_source(name))
    }

    fn set_source_buffer(&self, name: u32, buffer: u32) {
        self.run(|m| m.set_source_buffer(name, buffer))
    }

    fn source_buffer(&self, name: u32) -> u32 {
        self.run(|m| m.source_buffer(name))
    }

    fn play(&self, name: u32) {
        self.run(|m| m.play(name))
    }

    fn resume(&self, name: u32) {
        self.run(|m| m.resume(name))
    }

    fn pause(&self, name: u32) {
        self.run(|m| m.pause(name))
    }

    fn stop(&self, name: u32) {
        self.run(|m| m.stop(name))
    }

    fn source_state(&self, name: u32) -> SourceState {
        self.run(|m| m.source_state(name))
    }

    fn set_sample_offset(&self, name: u32, offset: u32) {
        self.run(|m| m.set_sample_offset(name, offset))
    }

    fn sample_offset(&self, name: u32) -> u32 {
        self.run(|m| m.sample_offset(name))
    }

    fn set_looping(&self, name: u32, looping: bool) {
        self.run(|m| m.set_looping(name, looping))
    }

    fn looping(&self, name: u32) -> bool {
        self.run(|m| m.looping(name))
    }

    fn set_gain(&self, name: u32, gain: f32) {
        self.run(|m| m.set_gain(name, gain))
    }

    fn gain(&self, name: u32) -> f32 {
        self.run(|m| m.gain(name))
    }

    fn set_pitch(&self, name: u32, pitch: f32) {
        self.run(|m| m.set_pitch(name, pitch))
    }

    fn pitch(&self, name: u32) -> f32 {
        self.run(|m| m.pitch(name))
    }

    fn set_position(&self, name: u32, position: [f32; 3]) {
        self.run(|m| m.set_position(name, position))
    }

    fn position(&self, name: u32) -> [f32; 3] {
        self.run(|m| m.position(name))
    }
}

impl Drop for SoftwareAudio {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log::warn!("failed to pause audio stream: {err}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::api::code;

    #[test]
    fn headless_output_renders_on_demand() {
        let audio = SoftwareAudio::headless(2, 1);
        let buffer = audio.create_buffer();
        audio.buffer_data(buffer, SampleFormat::Mono8, &[255, 128], 2);
        let source = audio.create_source();
        audio.set_source_buffer(source, buffer);
        audio.play(source);

        let mut out = [0.0; 3];
        audio.render(&mut out);

        assert!(audio.is_headless());
        assert_eq!([127.0 / 128.0, 0.0, 0.0], out);
        assert_eq!(SourceState::Stopped, audio.source_state(source));
        assert_eq!(code::NO_ERROR, audio.get_error());
    }

    #[test]
    fn failed_queries_return_defaults_and_flag_an_error() {
        let audio = SoftwareAudio::headless(44_100, 2);

        assert_eq!(0, audio.buffer_channels(7));
        assert_eq!(code::INVALID_NAME, audio.get_error());
        assert_eq!(code::NO_ERROR, audio.get_error());
    }
}
