use std::sync::Arc;

use winit::{dpi::LogicalSize, event_loop::ControlFlow};

use crate::{context::Uid, VelaResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vela".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

pub struct EventLoop {
    el: winit::event_loop::EventLoop<()>,
}

impl EventLoop {
    pub fn new() -> VelaResult<Self> {
        let el = winit::event_loop::EventLoopBuilder::new().build()?;
        Ok(Self { el })
    }

    pub fn create_window(&self, config: &WindowConfig) -> VelaResult<Window> {
        let size = LogicalSize::new(config.width, config.height);
        let raw = winit::window::WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(size)
            .with_resizable(config.resizable)
            .build(&self.el)?;

        let window = Window {
            id: Uid::next(),
            width: config.width,
            height: config.height,
            raw: Some(Arc::new(raw)),
        };
        log::debug!("created window {} '{}'", window.id, config.title);

        Ok(window)
    }

    /// Pumps events into `handler` until it asks to exit or returns an error.
    pub fn run<F>(self, mut handler: F) -> VelaResult
    where
        F: FnMut(Event, &mut Control) -> VelaResult,
    {
        let mut control = Control::default();
        let mut result = Ok(());

        self.el.run(|e, el| {
            el.set_control_flow(ControlFlow::Poll);

            let event = match e {
                winit::event::Event::WindowEvent { event: e, .. } => match e {
                    winit::event::WindowEvent::CloseRequested => Some(Event::ExitRequested),
                    winit::event::WindowEvent::Resized(size) => Some(Event::Resized {
                        width: size.width,
                        height: size.height,
                    }),
                    _ => None,
                },
                winit::event::Event::AboutToWait => Some(Event::Update),
                _ => None,
            };

            if let Some(event) = event {
                if let Err(err) = handler(event, &mut control) {
                    result = Err(err);
                    control.exit();
                }
                if control.exit {
                    el.exit();
                }
            }
        })?;

        result
    }
}

#[derive(Debug, Default)]
pub struct Control {
    exit: bool,
}

impl Control {
    pub fn exit(&mut self) {
        self.exit = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ExitRequested,
    Resized { width: u32, height: u32 },
    Update,
}

/// A render target for graphics contexts.
///
/// Offscreen windows have an identity and a size but no surface.
#[derive(Debug, Clone)]
pub struct Window {
    id: Uid,
    width: u32,
    height: u32,
    raw: Option<Arc<winit::window::Window>>,
}

impl Window {
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            id: Uid::next(),
            width,
            height,
            raw: None,
        }
    }

    pub fn id(&self) -> Uid {
        self.id
    }

    /// Size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        match &self.raw {
            Some(raw) => {
                let size = raw.inner_size();
                (size.width, size.height)
            }
            None => (self.width, self.height),
        }
    }

    pub fn request_redraw(&self) {
        if let Some(raw) = &self.raw {
            raw.request_redraw();
        }
    }

    pub(crate) fn raw(&self) -> Option<&Arc<winit::window::Window>> {
        self.raw.as_ref()
    }
}
