use std::{borrow::Cow, cell::RefCell, collections::HashMap};

use crate::{
    context::Uid,
    graphics::{
        api::{
            code, AttributeBinding, BufferTarget, BufferUsage, GraphicsApi, ShaderStage,
            TextureFilter, TextureFormat, TextureRegion, TextureWrap, VertexAttribute,
            FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT,
        },
        driver::{check_source, Driver, DriverLimits},
    },
    sys::Window,
    Color, Error, VelaResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuConfig {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

struct Gpu {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Gpu {
    fn new(config: &GpuConfig) -> VelaResult<Self> {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: config.backends,
            flags,
            ..Default::default()
        });

        let adapter =
            match pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                force_fallback_adapter: false,
                compatible_surface: None,
            })) {
                Some(adapter) => adapter,
                None => return Err(Error::Gpu("failed to get graphics adapter".to_string())),
            };

        let (device, queue) = match pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vela device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        )) {
            Ok((device, queue)) => (device, queue),
            Err(err) => return Err(Error::Gpu(format!("failed to get graphics queue: {err}"))),
        };

        let info = adapter.get_info();
        log::debug!("using {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Runs `f` inside validation and out of memory error scopes and reports the error as a
    /// native code.
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<(u32, String)>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        let error = validation.or(oom).map(|err| match err {
            wgpu::Error::OutOfMemory { .. } => (code::OUT_OF_MEMORY, err.to_string()),
            _ => (code::INVALID_OPERATION, err.to_string()),
        });

        (value, error)
    }
}

struct Backbuffer {
    window: Uid,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

#[derive(Default)]
struct Resources {
    buffers: HashMap<u32, wgpu::Buffer>,
    textures: HashMap<u32, (wgpu::Texture, wgpu::Sampler)>,
    modules: HashMap<u32, wgpu::ShaderModule>,
    pipelines: HashMap<u32, wgpu::RenderPipeline>,
}

/// The graphics api on a wgpu device.
///
/// Object names, bindings and validation come from the same driver the headless api uses.
/// Successful calls are mirrored onto wgpu objects and wgpu's own errors are reported through
/// the sticky error flag.
pub struct WgpuGraphics {
    gpu: Gpu,
    driver: RefCell<Driver>,
    resources: RefCell<Resources>,
    backbuffer: RefCell<Option<Backbuffer>>,
}

impl WgpuGraphics {
    pub fn new(config: &GpuConfig) -> VelaResult<Self> {
        let gpu = Gpu::new(config)?;
        let limits = gpu.device.limits();
        let driver = Driver::new(DriverLimits {
            max_texture_size: limits.max_texture_dimension_2d,
            max_texture_units: limits.max_sampled_textures_per_shader_stage,
            max_vertex_attributes: limits.max_vertex_attributes,
            memory_budget: None,
        });

        Ok(Self {
            gpu,
            driver: RefCell::new(driver),
            resources: RefCell::default(),
            backbuffer: RefCell::new(None),
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.gpu.adapter.get_info()
    }

    fn run<T: Default>(&self, f: impl FnOnce(&mut Driver) -> Result<T, u32>) -> T {
        self.driver.borrow_mut().run(f)
    }

    fn try_run<T>(&self, f: impl FnOnce(&mut Driver) -> Result<T, u32>) -> Option<T> {
        self.driver.borrow_mut().try_run(f)
    }

    fn raise(&self, error: Option<(u32, String)>) {
        if let Some((code, message)) = error {
            log::error!("wgpu error {code:#06x}: {message}");
            self.driver.borrow_mut().raise(code);
        }
    }

    fn target_format(&self) -> wgpu::TextureFormat {
        match &*self.backbuffer.borrow() {
            Some(backbuffer) => backbuffer.config.format,
            None => wgpu::TextureFormat::Bgra8Unorm,
        }
    }

    /// Recreates the wgpu buffer from the driver's copy of its contents.
    fn sync_buffer(&self, name: u32) {
        let driver = self.driver.borrow();
        let Ok(buffer) = driver.buffer(name) else {
            return;
        };

        // Copies must be a multiple of four bytes.
        let size = buffer.data.len().max(1).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
        let mut contents = buffer.data.clone();
        contents.resize(size, 0);
        drop(driver);

        let (buffer, error) = self.gpu.scoped(|device| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("vela buffer"),
                size: size as u64,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::INDEX
                    | wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            self.gpu.queue.write_buffer(&buffer, 0, &contents);
            buffer
        });

        self.resources.borrow_mut().buffers.insert(name, buffer);
        self.raise(error);
    }

    /// Recreates the wgpu texture, every mip level and its sampler from the driver's copy.
    fn sync_texture(&self, name: u32) {
        let driver = self.driver.borrow();
        let Ok(texture) = driver.texture(name) else {
            return;
        };
        let Some(base) = texture.levels.first() else {
            return;
        };

        let format = texture.format;
        let bpp = format.bytes_per_pixel() as u32;
        let (min, mag) = texture.filter;
        let (s, t) = texture.wrap;

        let (created, error) = self.gpu.scoped(|device| {
            let gpu_texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("vela texture"),
                size: wgpu::Extent3d {
                    width: base.width,
                    height: base.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: texture.levels.len() as u32,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: format.into(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });

            for (mip_level, level) in texture.levels.iter().enumerate() {
                self.gpu.queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &gpu_texture,
                        mip_level: mip_level as u32,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    &level.pixels,
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(level.width * bpp),
                        rows_per_image: Some(level.height),
                    },
                    wgpu::Extent3d {
                        width: level.width,
                        height: level.height,
                        depth_or_array_layers: 1,
                    },
                );
            }

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("vela sampler"),
                address_mode_u: s.into(),
                address_mode_v: t.into(),
                mag_filter: mag.into(),
                min_filter: min.into(),
                ..Default::default()
            });

            (gpu_texture, sampler)
        });
        drop(driver);

        self.resources.borrow_mut().textures.insert(name, created);
        self.raise(error);
    }

    fn compile_module(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<wgpu::ShaderModule, String> {
        check_source(stage, source)?;

        let (module, error) = self.gpu.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(stage.entry_point()),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
            })
        });

        match error {
            Some((_, message)) => Err(message),
            None => Ok(module),
        }
    }

    fn create_pipeline(&self, vs: u32, fs: u32) -> Result<wgpu::RenderPipeline, String> {
        let format = self.target_format();
        let resources = self.resources.borrow();
        let modules = (resources.modules.get(&vs), resources.modules.get(&fs));
        let (Some(vs), Some(fs)) = modules else {
            return Err("error: attached shader has no compiled module".to_string());
        };

        let (pipeline, error) = self.gpu.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("vela program"),
                layout: None,
                vertex: wgpu::VertexState {
                    module: vs,
                    entry_point: VERTEX_ENTRY_POINT,
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: fs,
                    entry_point: FRAGMENT_ENTRY_POINT,
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            })
        });

        match error {
            Some((_, message)) => Err(message),
            None => Ok(pipeline),
        }
    }

    fn configure_backbuffer(&self, window: &Window) -> VelaResult {
        let (width, height) = window.size();
        let (width, height) = (width.max(1), height.max(1));

        let mut backbuffer = self.backbuffer.borrow_mut();
        if let Some(current) = backbuffer.as_mut().filter(|b| b.window == window.id()) {
            if (current.config.width, current.config.height) != (width, height) {
                current.config.width = width;
                current.config.height = height;
                current.surface.configure(&self.gpu.device, &current.config);
            }
            return Ok(());
        }

        let Some(raw) = window.raw() else {
            *backbuffer = None;
            return Ok(());
        };

        let surface = self
            .gpu
            .instance
            .create_surface(raw.clone())
            .map_err(|err| Error::Gpu(format!("failed to create a window surface: {err}")))?;
        let config = match surface.get_default_config(&self.gpu.adapter, width, height) {
            Some(config) => config,
            None => return Err(Error::Gpu("backbuffer surface is not supported".to_string())),
        };
        surface.configure(&self.gpu.device, &config);

        *backbuffer = Some(Backbuffer {
            window: window.id(),
            surface,
            config,
        });

        Ok(())
    }

    fn present_clear(&self, color: Color) -> Result<(), wgpu::SurfaceError> {
        let backbuffer = self.backbuffer.borrow();
        let Some(backbuffer) = backbuffer.as_ref() else {
            return Ok(());
        };

        let frame = backbuffer.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("backbuffer"),
            ..Default::default()
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();

        Ok(())
    }
}

impl GraphicsApi for WgpuGraphics {
    fn get_error(&self) -> u32 {
        self.driver.borrow_mut().take_error()
    }

    fn make_current(&self, context: Uid, window: Option<&Window>) {
        self.driver
            .borrow_mut()
            .make_current(context, window.map(Window::id));

        let result = match window {
            Some(window) => self.configure_backbuffer(window),
            None => {
                self.backbuffer.replace(None);
                Ok(())
            }
        };
        if let Err(err) = result {
            log::error!("{err}");
            self.driver.borrow_mut().raise(code::INVALID_OPERATION);
        }
    }

    fn release_context(&self, context: Uid) {
        self.driver.borrow_mut().release_context(context);
    }

    fn clear(&self, color: Color) {
        self.driver.borrow_mut().clear(color);

        if let Err(err) = self.present_clear(color) {
            log::warn!("failed to present: {err}");
            if let (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated, Some(backbuffer)) =
                (err, self.backbuffer.borrow().as_ref())
            {
                backbuffer
                    .surface
                    .configure(&self.gpu.device, &backbuffer.config);
            }
            self.driver
                .borrow_mut()
                .raise(code::INVALID_FRAMEBUFFER_OPERATION);
        }
    }

    fn create_buffer(&self) -> u32 {
        self.run(|d| d.create_buffer())
    }

    fn delete_buffer(&self, name: u32) {
        self.run(|d| d.delete_buffer(name));
        if let Some(buffer) = self.resources.borrow_mut().buffers.remove(&name) {
            buffer.destroy();
        }
    }

    fn bind_buffer(&self, target: BufferTarget, name: u32) {
        self.run(|d| d.bind_buffer(target, name))
    }

    fn bound_buffer(&self, target: BufferTarget) -> u32 {
        self.run(|d| d.bound_buffer(target))
    }

    fn buffer_data(&self, name: u32, data: &[u8], usage: BufferUsage) {
        if self
            .try_run(|d| d.buffer_data(name, data, usage))
            .is_some()
        {
            self.sync_buffer(name);
        }
    }

    fn buffer_sub_data(&self, name: u32, offset: usize, data: &[u8]) {
        if self
            .try_run(|d| d.buffer_sub_data(name, offset, data))
            .is_some()
        {
            self.sync_buffer(name);
        }
    }

    fn read_buffer(&self, name: u32, offset: usize, out: &mut [u8]) {
        // The driver's copy always matches what was last written to the device.
        self.run(|d| d.read_buffer(name, offset, out))
    }

    fn buffer_size(&self, name: u32) -> usize {
        self.run(|d| d.buffer_size(name))
    }

    fn buffer_usage(&self, name: u32) -> BufferUsage {
        self.run(|d| d.buffer_usage(name))
    }

    fn create_texture(&self) -> u32 {
        self.run(|d| d.create_texture())
    }

    fn delete_texture(&self, name: u32) {
        self.run(|d| d.delete_texture(name));
        if let Some((texture, _)) = self.resources.borrow_mut().textures.remove(&name) {
            texture.destroy();
        }
    }

    fn bind_texture(&self, unit: u32, name: u32) {
        self.run(|d| d.bind_texture(unit, name))
    }

    fn bound_texture(&self, unit: u32) -> u32 {
        self.run(|d| d.bound_texture(unit))
    }

    fn texture_image(
        &self,
        name: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Option<&[u8]>,
    ) {
        if self
            .try_run(|d| d.texture_image(name, width, height, format, pixels))
            .is_some()
        {
            self.sync_texture(name);
        }
    }

    fn texture_sub_image(&self, name: u32, region: TextureRegion, pixels: &[u8]) {
        if self
            .try_run(|d| d.texture_sub_image(name, region, pixels))
            .is_some()
        {
            self.sync_texture(name);
        }
    }

    fn texture_size(&self, name: u32, level: u32) -> (u32, u32) {
        self.run(|d| d.texture_size(name, level))
    }

    fn texture_format(&self, name: u32) -> TextureFormat {
        self.run(|d| d.texture_format(name))
    }

    fn set_texture_filter(&self, name: u32, min: TextureFilter, mag: TextureFilter) {
        if self
            .try_run(|d| d.set_texture_filter(name, min, mag))
            .is_some()
        {
            self.sync_texture(name);
        }
    }

    fn texture_filter(&self, name: u32) -> (TextureFilter, TextureFilter) {
        self.run(|d| d.texture_filter(name))
    }

    fn set_texture_wrap(&self, name: u32, s: TextureWrap, t: TextureWrap) {
        if self.try_run(|d| d.set_texture_wrap(name, s, t)).is_some() {
            self.sync_texture(name);
        }
    }

    fn texture_wrap(&self, name: u32) -> (TextureWrap, TextureWrap) {
        self.run(|d| d.texture_wrap(name))
    }

    fn generate_mipmaps(&self, name: u32) {
        if self.try_run(|d| d.generate_mipmaps(name)).is_some() {
            self.sync_texture(name);
        }
    }

    fn texture_levels(&self, name: u32) -> u32 {
        self.run(|d| d.texture_levels(name))
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        self.run(|d| d.create_shader(stage))
    }

    fn delete_shader(&self, name: u32) {
        self.run(|d| d.delete_shader(name));
        self.resources.borrow_mut().modules.remove(&name);
    }

    fn shader_source(&self, name: u32, source: &str) {
        self.run(|d| d.shader_source(name, source))
    }

    fn compile_shader(&self, name: u32) {
        let mut module = None;
        self.run(|d| {
            d.compile_shader(name, |stage, source| {
                module = Some(self.compile_module(stage, source)?);
                Ok(())
            })
        });

        let mut resources = self.resources.borrow_mut();
        match module {
            Some(module) => resources.modules.insert(name, module),
            None => resources.modules.remove(&name),
        };
    }

    fn shader_compiled(&self, name: u32) -> bool {
        self.run(|d| d.shader_compiled(name))
    }

    fn shader_info_log(&self, name: u32) -> String {
        self.run(|d| d.shader_info_log(name))
    }

    fn shader_stage(&self, name: u32) -> ShaderStage {
        self.run(|d| d.shader_stage(name))
    }

    fn create_program(&self) -> u32 {
        self.run(|d| d.create_program())
    }

    fn delete_program(&self, name: u32) {
        self.run(|d| d.delete_program(name));
        self.resources.borrow_mut().pipelines.remove(&name);
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.run(|d| d.attach_shader(program, shader))
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.run(|d| d.detach_shader(program, shader))
    }

    fn link_program(&self, name: u32) {
        let mut pipeline = None;
        self.run(|d| {
            d.link_program(name, |vs, fs| {
                pipeline = Some(self.create_pipeline(vs, fs)?);
                Ok(())
            })
        });

        let mut resources = self.resources.borrow_mut();
        match pipeline {
            Some(pipeline) => resources.pipelines.insert(name, pipeline),
            None => resources.pipelines.remove(&name),
        };
    }

    fn program_linked(&self, name: u32) -> bool {
        self.run(|d| d.program_linked(name))
    }

    fn program_info_log(&self, name: u32) -> String {
        self.run(|d| d.program_info_log(name))
    }

    fn use_program(&self, name: u32) {
        self.run(|d| d.use_program(name))
    }

    fn current_program(&self) -> u32 {
        self.run(|d| d.current_program())
    }

    fn create_vertex_array(&self) -> u32 {
        self.run(|d| d.create_vertex_array())
    }

    fn delete_vertex_array(&self, name: u32) {
        self.run(|d| d.delete_vertex_array(name))
    }

    fn bind_vertex_array(&self, name: u32) {
        self.run(|d| d.bind_vertex_array(name))
    }

    fn bound_vertex_array(&self) -> u32 {
        self.run(|d| d.bound_vertex_array())
    }

    fn vertex_attribute(&self, index: u32, layout: VertexAttribute) {
        self.run(|d| d.vertex_attribute(index, layout))
    }

    fn set_attribute_enabled(&self, index: u32, enabled: bool) {
        self.run(|d| d.set_attribute_enabled(index, enabled))
    }

    fn attribute_binding(&self, index: u32) -> Option<AttributeBinding> {
        self.run(|d| d.attribute_binding(index))
    }
}
