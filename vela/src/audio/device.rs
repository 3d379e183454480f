use std::rc::Rc;

use crate::{
    audio::{api::AudioApi, output::SoftwareAudio, Audio},
    context::{self, Binding, CurrentContext, ShareGroup, Uid},
    VelaResult,
};

/// An audio output endpoint. Buffers created under any of its contexts belong to it.
pub struct AudioDevice {
    uid: Uid,
    api: Rc<dyn AudioApi>,
}

impl AudioDevice {
    pub fn with_api(api: Rc<dyn AudioApi>) -> Self {
        let uid = Uid::next();
        log::debug!("opened audio device {uid}");
        Self { uid, api }
    }

    pub fn open_default() -> VelaResult<Self> {
        Ok(Self::with_api(Rc::new(SoftwareAudio::open_default()?)))
    }

    /// A device with no output, 44.1 kHz stereo.
    pub fn headless() -> Self {
        Self::with_api(Rc::new(SoftwareAudio::headless(44_100, 2)))
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn api(&self) -> &Rc<dyn AudioApi> {
        &self.api
    }
}

/// A context on an audio device. Sources created under it may only be used while it is
/// current.
pub struct AudioContext {
    uid: Uid,
    device: Uid,
    share_group: Rc<ShareGroup>,
    api: Rc<dyn AudioApi>,
}

impl AudioContext {
    pub fn new(device: &AudioDevice) -> Self {
        let uid = Uid::next();
        log::debug!("created audio context {uid} on device {}", device.uid);

        Self {
            uid,
            device: device.uid,
            share_group: ShareGroup::new(uid),
            api: device.api.clone(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Uid of the device this context was created on.
    pub fn device(&self) -> Uid {
        self.device
    }

    pub fn make_current(&self) {
        context::set_current::<Audio>(Binding {
            context: self.uid,
            device: self.device,
            share_group: self.share_group.clone(),
            api: self.api.clone(),
        });
    }

    pub fn is_current(&self) -> bool {
        context::is_current::<Audio>(self.uid)
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        if self.is_current() {
            context::unset_current::<Audio>();
        }
        log::debug!("destroyed audio context {}", self.uid);
    }
}

pub fn set_current(context: &AudioContext) {
    context.make_current();
}

pub fn unset_current() {
    log::debug!("no audio context is current");
    context::unset_current::<Audio>();
}

pub fn current() -> Option<CurrentContext> {
    context::current::<Audio>()
}

pub fn is_current(context: &AudioContext) -> bool {
    context.is_current()
}
