//! In-memory object model of the graphics api.
//!
//! The driver owns every object name. Binding points, the target window and the sticky error
//! flag are kept per context, so contexts that share objects never see each other's bindings.
//! Back ends forward their calls here for bookkeeping and validation and only mirror successful
//! calls onto real hardware.

use std::collections::HashMap;

use crate::{
    context::Uid,
    graphics::{
        api::{
            code, AttributeBinding, BufferTarget, BufferUsage, ShaderStage, TextureFilter,
            TextureFormat, TextureRegion, TextureWrap, VertexAttribute, FRAGMENT_ENTRY_POINT,
            VERTEX_ENTRY_POINT,
        },
        mip::{self, Level},
    },
    names::NameTable,
    Color,
};

/// Hardware limits enforced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverLimits {
    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
    /// Total bytes of buffer and texture storage before allocations fail with out of memory.
    pub memory_budget: Option<usize>,
}

impl Default for DriverLimits {
    fn default() -> Self {
        Self {
            max_texture_size: 8192,
            max_texture_units: 16,
            max_vertex_attributes: 16,
            memory_budget: None,
        }
    }
}

type Native<T = ()> = Result<T, u32>;

pub(crate) struct BufferObject {
    pub(crate) data: Vec<u8>,
    usage: BufferUsage,
}

pub(crate) struct TextureObject {
    pub(crate) format: TextureFormat,
    pub(crate) levels: Vec<Level>,
    pub(crate) filter: (TextureFilter, TextureFilter),
    pub(crate) wrap: (TextureWrap, TextureWrap),
}

impl TextureObject {
    fn bytes(&self) -> usize {
        self.levels.iter().map(|level| level.pixels.len()).sum()
    }
}

pub(crate) struct ShaderObject {
    pub(crate) stage: ShaderStage,
    pub(crate) source: String,
    compiled: bool,
    log: String,
}

#[derive(Default)]
pub(crate) struct ProgramObject {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
}

pub(crate) struct VertexArrayObject {
    attributes: Vec<Option<AttributeBinding>>,
}

/// Per-context state.
struct ContextState {
    error: u32,
    bound_buffers: [u32; BufferTarget::COUNT],
    bound_textures: Vec<u32>,
    bound_vertex_array: u32,
    current_program: u32,
    window: Option<Uid>,
}

impl ContextState {
    fn new(limits: &DriverLimits) -> Self {
        Self {
            error: code::NO_ERROR,
            bound_buffers: [0; BufferTarget::COUNT],
            bound_textures: vec![0; limits.max_texture_units as usize],
            bound_vertex_array: 0,
            current_program: 0,
            window: None,
        }
    }

    fn unbind_buffer(&mut self, name: u32) {
        for bound in self.bound_buffers.iter_mut().filter(|bound| **bound == name) {
            *bound = 0;
        }
    }

    fn unbind_texture(&mut self, name: u32) {
        for bound in self.bound_textures.iter_mut().filter(|bound| **bound == name) {
            *bound = 0;
        }
    }
}

pub(crate) struct Driver {
    limits: DriverLimits,
    memory_used: usize,

    buffers: NameTable<BufferObject>,
    textures: NameTable<TextureObject>,
    shaders: NameTable<ShaderObject>,
    programs: NameTable<ProgramObject>,
    vertex_arrays: NameTable<VertexArrayObject>,

    // Calls made before any context is made current land under `Uid::NONE`.
    active: Uid,
    contexts: HashMap<Uid, ContextState>,

    clear_color: Option<Color>,
}

impl Driver {
    pub(crate) fn new(limits: DriverLimits) -> Self {
        Self {
            limits,
            memory_used: 0,
            buffers: NameTable::default(),
            textures: NameTable::default(),
            shaders: NameTable::default(),
            programs: NameTable::default(),
            vertex_arrays: NameTable::default(),
            active: Uid::NONE,
            contexts: HashMap::new(),
            clear_color: None,
        }
    }

    pub(crate) fn limits(&self) -> DriverLimits {
        self.limits
    }

    pub(crate) fn memory_used(&self) -> usize {
        self.memory_used
    }

    fn state(&mut self) -> &mut ContextState {
        let limits = &self.limits;
        self.contexts
            .entry(self.active)
            .or_insert_with(|| ContextState::new(limits))
    }

    /// Records `code` on the active context unless an earlier error has not been read yet.
    pub(crate) fn raise(&mut self, code: u32) {
        let state = self.state();
        if state.error == code::NO_ERROR {
            state.error = code;
        }
    }

    pub(crate) fn take_error(&mut self) -> u32 {
        std::mem::replace(&mut self.state().error, code::NO_ERROR)
    }

    /// Runs a call, raising its error. `None` means the call failed and must not be mirrored.
    pub(crate) fn try_run<T>(&mut self, f: impl FnOnce(&mut Self) -> Native<T>) -> Option<T> {
        match f(self) {
            Ok(value) => Some(value),
            Err(code) => {
                self.raise(code);
                None
            }
        }
    }

    pub(crate) fn run<T: Default>(&mut self, f: impl FnOnce(&mut Self) -> Native<T>) -> T {
        self.try_run(f).unwrap_or_default()
    }

    fn reserve(&mut self, released: usize, requested: usize) -> Native {
        let used = self.memory_used.saturating_sub(released) + requested;
        match self.limits.memory_budget {
            Some(budget) if used > budget => Err(code::OUT_OF_MEMORY),
            _ => {
                self.memory_used = used;
                Ok(())
            }
        }
    }

    // ----- Context -----

    /// Switches to the state of `context`, creating it on first use, and targets `window`.
    pub(crate) fn make_current(&mut self, context: Uid, window: Option<Uid>) {
        self.active = context;
        self.state().window = window;
    }

    /// Drops the state of a destroyed context.
    pub(crate) fn release_context(&mut self, context: Uid) {
        self.contexts.remove(&context);
        if self.active == context {
            self.active = Uid::NONE;
        }
    }

    pub(crate) fn window(&self) -> Option<Uid> {
        self.contexts
            .get(&self.active)
            .and_then(|state| state.window)
    }

    pub(crate) fn clear(&mut self, color: Color) {
        self.clear_color = Some(color);
    }

    pub(crate) fn clear_color(&self) -> Option<Color> {
        self.clear_color
    }

    // ----- Buffers -----

    pub(crate) fn create_buffer(&mut self) -> Native<u32> {
        self.buffers
            .insert(BufferObject {
                data: Vec::new(),
                usage: BufferUsage::default(),
            })
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_buffer(&mut self, name: u32) -> Native {
        // Deleting an unknown name is silently ignored.
        if let Some(buffer) = self.buffers.remove(name) {
            self.memory_used = self.memory_used.saturating_sub(buffer.data.len());
            self.contexts
                .values_mut()
                .for_each(|state| state.unbind_buffer(name));
        }
        Ok(())
    }

    pub(crate) fn bind_buffer(&mut self, target: BufferTarget, name: u32) -> Native {
        if name != 0 && !self.buffers.contains(name) {
            return Err(code::INVALID_OPERATION);
        }
        self.state().bound_buffers[target.index()] = name;
        Ok(())
    }

    pub(crate) fn bound_buffer(&mut self, target: BufferTarget) -> Native<u32> {
        Ok(self.state().bound_buffers[target.index()])
    }

    pub(crate) fn buffer(&self, name: u32) -> Native<&BufferObject> {
        self.buffers.get(name).ok_or(code::INVALID_OPERATION)
    }

    pub(crate) fn buffer_data(&mut self, name: u32, data: &[u8], usage: BufferUsage) -> Native {
        let released = self.buffer(name)?.data.len();
        self.reserve(released, data.len())?;

        let buffer = self.buffers.get_mut(name).ok_or(code::INVALID_OPERATION)?;
        buffer.data = data.to_vec();
        buffer.usage = usage;
        Ok(())
    }

    pub(crate) fn buffer_sub_data(&mut self, name: u32, offset: usize, data: &[u8]) -> Native {
        let buffer = self.buffers.get_mut(name).ok_or(code::INVALID_OPERATION)?;
        let end = offset.checked_add(data.len()).ok_or(code::INVALID_VALUE)?;
        if end > buffer.data.len() {
            return Err(code::INVALID_VALUE);
        }
        buffer.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn read_buffer(&mut self, name: u32, offset: usize, out: &mut [u8]) -> Native {
        let buffer = self.buffer(name)?;
        let end = offset.checked_add(out.len()).ok_or(code::INVALID_VALUE)?;
        if end > buffer.data.len() {
            return Err(code::INVALID_VALUE);
        }
        out.copy_from_slice(&buffer.data[offset..end]);
        Ok(())
    }

    pub(crate) fn buffer_size(&mut self, name: u32) -> Native<usize> {
        Ok(self.buffer(name)?.data.len())
    }

    pub(crate) fn buffer_usage(&self, name: u32) -> Native<BufferUsage> {
        Ok(self.buffer(name)?.usage)
    }

    // ----- Textures -----

    pub(crate) fn create_texture(&mut self) -> Native<u32> {
        self.textures
            .insert(TextureObject {
                format: TextureFormat::default(),
                levels: Vec::new(),
                filter: (TextureFilter::default(), TextureFilter::default()),
                wrap: (TextureWrap::default(), TextureWrap::default()),
            })
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_texture(&mut self, name: u32) -> Native {
        if let Some(texture) = self.textures.remove(name) {
            self.memory_used = self.memory_used.saturating_sub(texture.bytes());
            self.contexts
                .values_mut()
                .for_each(|state| state.unbind_texture(name));
        }
        Ok(())
    }

    pub(crate) fn texture(&self, name: u32) -> Native<&TextureObject> {
        self.textures.get(name).ok_or(code::INVALID_OPERATION)
    }

    fn texture_mut(&mut self, name: u32) -> Native<&mut TextureObject> {
        self.textures.get_mut(name).ok_or(code::INVALID_OPERATION)
    }

    pub(crate) fn bind_texture(&mut self, unit: u32, name: u32) -> Native {
        if unit >= self.limits.max_texture_units {
            return Err(code::INVALID_VALUE);
        }
        if name != 0 && !self.textures.contains(name) {
            return Err(code::INVALID_OPERATION);
        }
        self.state().bound_textures[unit as usize] = name;
        Ok(())
    }

    pub(crate) fn bound_texture(&mut self, unit: u32) -> Native<u32> {
        self.state()
            .bound_textures
            .get(unit as usize)
            .copied()
            .ok_or(code::INVALID_VALUE)
    }

    pub(crate) fn texture_image(
        &mut self,
        name: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Option<&[u8]>,
    ) -> Native {
        let released = self.texture(name)?.bytes();
        let max = self.limits.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(code::INVALID_VALUE);
        }

        let mut level = Level::new(width, height, format.bytes_per_pixel());
        if let Some(pixels) = pixels {
            if pixels.len() != level.pixels.len() {
                return Err(code::INVALID_VALUE);
            }
            level.pixels.copy_from_slice(pixels);
        }
        self.reserve(released, level.pixels.len())?;

        let texture = self.texture_mut(name)?;
        texture.format = format;
        texture.levels = vec![level];
        Ok(())
    }

    pub(crate) fn texture_sub_image(
        &mut self,
        name: u32,
        region: TextureRegion,
        pixels: &[u8],
    ) -> Native {
        let texture = self.texture_mut(name)?;
        let bpp = texture.format.bytes_per_pixel();
        let level = texture
            .levels
            .get_mut(region.level as usize)
            .ok_or(code::INVALID_VALUE)?;

        let right = region.x.checked_add(region.width).ok_or(code::INVALID_VALUE)?;
        let bottom = region.y.checked_add(region.height).ok_or(code::INVALID_VALUE)?;
        if right > level.width || bottom > level.height {
            return Err(code::INVALID_VALUE);
        }
        let row = region.width as usize * bpp;
        if pixels.len() != row * region.height as usize {
            return Err(code::INVALID_VALUE);
        }

        let stride = level.width as usize * bpp;
        for (y, src) in pixels.chunks_exact(row.max(1)).enumerate() {
            let start = (region.y as usize + y) * stride + region.x as usize * bpp;
            level.pixels[start..start + row].copy_from_slice(&src[..row]);
        }
        Ok(())
    }

    pub(crate) fn texture_size(&mut self, name: u32, level: u32) -> Native<(u32, u32)> {
        let texture = self.texture(name)?;
        match texture.levels.get(level as usize) {
            Some(level) => Ok((level.width, level.height)),
            None if level == 0 => Ok((0, 0)),
            None => Err(code::INVALID_VALUE),
        }
    }

    pub(crate) fn texture_format(&mut self, name: u32) -> Native<TextureFormat> {
        Ok(self.texture(name)?.format)
    }

    pub(crate) fn set_texture_filter(
        &mut self,
        name: u32,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Native {
        self.texture_mut(name)?.filter = (min, mag);
        Ok(())
    }

    pub(crate) fn texture_filter(&mut self, name: u32) -> Native<(TextureFilter, TextureFilter)> {
        Ok(self.texture(name)?.filter)
    }

    pub(crate) fn set_texture_wrap(&mut self, name: u32, s: TextureWrap, t: TextureWrap) -> Native {
        self.texture_mut(name)?.wrap = (s, t);
        Ok(())
    }

    pub(crate) fn texture_wrap(&mut self, name: u32) -> Native<(TextureWrap, TextureWrap)> {
        Ok(self.texture(name)?.wrap)
    }

    pub(crate) fn generate_mipmaps(&mut self, name: u32) -> Native {
        let texture = self.texture(name)?;
        let Some(base) = texture.levels.first() else {
            return Err(code::INVALID_OPERATION);
        };

        let released = texture.bytes();
        let levels = mip::chain(base.clone(), texture.format.bytes_per_pixel());
        let requested = levels.iter().map(|level| level.pixels.len()).sum();
        self.reserve(released, requested)?;

        self.texture_mut(name)?.levels = levels;
        Ok(())
    }

    pub(crate) fn texture_levels(&mut self, name: u32) -> Native<u32> {
        Ok(self.texture(name)?.levels.len() as u32)
    }

    // ----- Shaders -----

    pub(crate) fn create_shader(&mut self, stage: ShaderStage) -> Native<u32> {
        self.shaders
            .insert(ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            })
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_shader(&mut self, name: u32) -> Native {
        self.shaders.remove(name);
        Ok(())
    }

    pub(crate) fn shader(&self, name: u32) -> Native<&ShaderObject> {
        self.shaders.get(name).ok_or(code::INVALID_VALUE)
    }

    pub(crate) fn shader_source(&mut self, name: u32, source: &str) -> Native {
        let shader = self.shaders.get_mut(name).ok_or(code::INVALID_VALUE)?;
        shader.source = source.to_string();
        Ok(())
    }

    /// Compiles with `compiler`, which returns the diagnostic log on failure.
    pub(crate) fn compile_shader(
        &mut self,
        name: u32,
        compiler: impl FnOnce(ShaderStage, &str) -> Result<(), String>,
    ) -> Native {
        let shader = self.shaders.get_mut(name).ok_or(code::INVALID_VALUE)?;
        match compiler(shader.stage, &shader.source) {
            Ok(()) => {
                shader.compiled = true;
                shader.log.clear();
            }
            Err(log) => {
                shader.compiled = false;
                shader.log = log;
            }
        }
        Ok(())
    }

    pub(crate) fn shader_compiled(&mut self, name: u32) -> Native<bool> {
        Ok(self.shader(name)?.compiled)
    }

    pub(crate) fn shader_info_log(&mut self, name: u32) -> Native<String> {
        Ok(self.shader(name)?.log.clone())
    }

    pub(crate) fn shader_stage(&mut self, name: u32) -> Native<ShaderStage> {
        Ok(self.shader(name)?.stage)
    }

    // ----- Programs -----

    pub(crate) fn create_program(&mut self) -> Native<u32> {
        self.programs
            .insert(ProgramObject::default())
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_program(&mut self, name: u32) -> Native {
        if self.programs.remove(name).is_some() {
            for state in self.contexts.values_mut() {
                if state.current_program == name {
                    state.current_program = 0;
                }
            }
        }
        Ok(())
    }

    fn program_mut(&mut self, name: u32) -> Native<&mut ProgramObject> {
        self.programs.get_mut(name).ok_or(code::INVALID_VALUE)
    }

    pub(crate) fn attach_shader(&mut self, program: u32, shader: u32) -> Native {
        self.shader(shader)?;
        let program = self.program_mut(program)?;
        if program.shaders.contains(&shader) {
            return Err(code::INVALID_OPERATION);
        }
        program.shaders.push(shader);
        Ok(())
    }

    pub(crate) fn detach_shader(&mut self, program: u32, shader: u32) -> Native {
        let program = self.program_mut(program)?;
        let index = program
            .shaders
            .iter()
            .position(|attached| *attached == shader)
            .ok_or(code::INVALID_OPERATION)?;
        program.shaders.remove(index);
        Ok(())
    }

    /// Links the attached stages. `linker` sees the vertex and fragment shader names once the
    /// stages have been matched up, and returns the diagnostic log on failure.
    pub(crate) fn link_program(
        &mut self,
        name: u32,
        linker: impl FnOnce(u32, u32) -> Result<(), String>,
    ) -> Native {
        let attached = self
            .programs
            .get(name)
            .ok_or(code::INVALID_VALUE)?
            .shaders
            .clone();

        let result = self
            .match_stages(&attached)
            .and_then(|(vs, fs)| linker(vs, fs));

        let program = self.program_mut(name)?;
        match result {
            Ok(()) => {
                program.linked = true;
                program.log.clear();
            }
            Err(log) => {
                program.linked = false;
                program.log = log;
            }
        }
        Ok(())
    }

    fn match_stages(&self, attached: &[u32]) -> Result<(u32, u32), String> {
        let mut vertex = None;
        let mut fragment = None;

        for name in attached {
            let Some(shader) = self.shaders.get(*name) else {
                return Err(format!("error: attached shader {name} has been deleted"));
            };
            if !shader.compiled {
                return Err(format!("error: attached shader {name} is not compiled"));
            }

            let slot = match shader.stage {
                ShaderStage::Vertex => &mut vertex,
                ShaderStage::Fragment => &mut fragment,
            };
            if slot.replace(*name).is_some() {
                return Err(format!(
                    "error: more than one {:?} shader attached",
                    shader.stage
                ));
            }
        }

        let vertex = vertex.ok_or_else(|| "error: no vertex shader attached".to_string())?;
        let fragment = fragment.ok_or_else(|| "error: no fragment shader attached".to_string())?;

        for (name, entry) in [(vertex, VERTEX_ENTRY_POINT), (fragment, FRAGMENT_ENTRY_POINT)] {
            let defines_entry = self
                .shaders
                .get(name)
                .is_some_and(|shader| defines_function(&shader.source, entry));
            if !defines_entry {
                return Err(format!("error: shader {name} does not define `fn {entry}`"));
            }
        }

        Ok((vertex, fragment))
    }

    pub(crate) fn program_linked(&mut self, name: u32) -> Native<bool> {
        Ok(self.programs.get(name).ok_or(code::INVALID_VALUE)?.linked)
    }

    pub(crate) fn program_info_log(&mut self, name: u32) -> Native<String> {
        Ok(self.programs.get(name).ok_or(code::INVALID_VALUE)?.log.clone())
    }

    pub(crate) fn use_program(&mut self, name: u32) -> Native {
        if name != 0 {
            let program = self.programs.get(name).ok_or(code::INVALID_VALUE)?;
            if !program.linked {
                return Err(code::INVALID_OPERATION);
            }
        }
        self.state().current_program = name;
        Ok(())
    }

    pub(crate) fn current_program(&mut self) -> Native<u32> {
        Ok(self.state().current_program)
    }

    // ----- Vertex arrays -----

    pub(crate) fn create_vertex_array(&mut self) -> Native<u32> {
        let attributes = vec![None; self.limits.max_vertex_attributes as usize];
        self.vertex_arrays
            .insert(VertexArrayObject { attributes })
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_vertex_array(&mut self, name: u32) -> Native {
        if self.vertex_arrays.remove(name).is_some() {
            for state in self.contexts.values_mut() {
                if state.bound_vertex_array == name {
                    state.bound_vertex_array = 0;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn bind_vertex_array(&mut self, name: u32) -> Native {
        if name != 0 && !self.vertex_arrays.contains(name) {
            return Err(code::INVALID_OPERATION);
        }
        self.state().bound_vertex_array = name;
        Ok(())
    }

    pub(crate) fn bound_vertex_array(&mut self) -> Native<u32> {
        Ok(self.state().bound_vertex_array)
    }

    fn bound_attribute(&mut self, index: u32) -> Native<&mut Option<AttributeBinding>> {
        let bound = self.state().bound_vertex_array;
        let vertex_array = self
            .vertex_arrays
            .get_mut(bound)
            .ok_or(code::INVALID_OPERATION)?;
        vertex_array
            .attributes
            .get_mut(index as usize)
            .ok_or(code::INVALID_VALUE)
    }

    pub(crate) fn vertex_attribute(&mut self, index: u32, layout: VertexAttribute) -> Native {
        if !(1..=4).contains(&layout.components) {
            return Err(code::INVALID_VALUE);
        }
        let buffer = self.state().bound_buffers[BufferTarget::Vertex.index()];
        if buffer == 0 {
            return Err(code::INVALID_OPERATION);
        }

        let slot = self.bound_attribute(index)?;
        let enabled = slot.is_some_and(|binding| binding.enabled);
        *slot = Some(AttributeBinding {
            buffer,
            layout,
            enabled,
        });
        Ok(())
    }

    pub(crate) fn set_attribute_enabled(&mut self, index: u32, enabled: bool) -> Native {
        let slot = self.bound_attribute(index)?;
        slot.get_or_insert_with(AttributeBinding::default).enabled = enabled;
        Ok(())
    }

    pub(crate) fn attribute_binding(&mut self, index: u32) -> Native<Option<AttributeBinding>> {
        Ok(*self.bound_attribute(index)?)
    }
}

/// Structural check of a WGSL-shaped source for one stage. Returns the compile log on failure.
pub(crate) fn check_source(stage: ShaderStage, source: &str) -> Result<(), String> {
    let mut errors = Vec::new();
    if source.trim().is_empty() {
        return Err("error: shader source is empty".to_string());
    }

    let mut open: Vec<(char, usize)> = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line_number = number + 1;
        let code = line.split("//").next().unwrap_or_default();
        for c in code.chars() {
            match c {
                '{' | '(' | '[' => open.push((c, line_number)),
                '}' | ')' | ']' => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match open.pop() {
                        Some((opener, _)) if opener == expected => {}
                        Some((opener, opened)) => errors.push(format!(
                            "{line_number}: error: '{c}' does not close '{opener}' opened at line {opened}"
                        )),
                        None => errors.push(format!("{line_number}: error: unexpected '{c}'")),
                    }
                }
                _ => {}
            }
        }
    }
    for (opener, opened) in open {
        errors.push(format!("{opened}: error: unclosed '{opener}'"));
    }

    let code: String = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    if !code.contains(stage.attribute()) {
        errors.push(format!(
            "error: no {} entry point found",
            stage.attribute()
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("\n"))
    }
}

fn defines_function(source: &str, name: &str) -> bool {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .any(|line| {
            line.split("fn ")
                .skip(1)
                .any(|rest| rest.trim_start().starts_with(name) && {
                    let tail = &rest.trim_start()[name.len()..];
                    tail.trim_start().starts_with('(')
                })
        })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const VERTEX: &str = "
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    return vec4<f32>(x, 0.0, 0.0, 1.0);
}
";

    pub(crate) const FRAGMENT: &str = "
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0); // red
}
";

    fn driver() -> Driver {
        Driver::new(DriverLimits::default())
    }

    #[test]
    fn first_error_sticks_until_read() {
        let mut d = driver();

        d.run(|d| d.bind_buffer(BufferTarget::Vertex, 99));
        d.run(|d| d.bind_texture(1000, 0));

        assert_eq!(code::INVALID_OPERATION, d.take_error());
        assert_eq!(code::NO_ERROR, d.take_error());
    }

    #[test]
    fn buffer_data_and_ranges() {
        let mut d = driver();
        let name = d.create_buffer().unwrap();

        d.buffer_data(name, &[1, 2, 3, 4], BufferUsage::Dynamic)
            .unwrap();
        d.buffer_sub_data(name, 2, &[9, 9]).unwrap();
        let mut out = [0; 4];
        d.read_buffer(name, 0, &mut out).unwrap();

        assert_eq!([1, 2, 9, 9], out);
        assert_eq!(Ok(4), d.buffer_size(name));
        assert_eq!(Ok(BufferUsage::Dynamic), d.buffer_usage(name));
        assert_eq!(Err(code::INVALID_VALUE), d.buffer_sub_data(name, 3, &[0, 0]));
        assert_eq!(Err(code::INVALID_OPERATION), d.buffer_size(name + 1));
    }

    #[test]
    fn deleting_a_bound_buffer_unbinds_it() {
        let mut d = driver();
        let name = d.create_buffer().unwrap();
        d.bind_buffer(BufferTarget::Index, name).unwrap();

        d.delete_buffer(name).unwrap();

        assert_eq!(Ok(0), d.bound_buffer(BufferTarget::Index));
        assert_eq!(Err(code::INVALID_OPERATION), d.buffer_size(name));
    }

    #[test]
    fn memory_budget_raises_out_of_memory() {
        let mut d = Driver::new(DriverLimits {
            memory_budget: Some(8),
            ..Default::default()
        });
        let a = d.create_buffer().unwrap();
        let b = d.create_buffer().unwrap();

        d.buffer_data(a, &[0; 6], BufferUsage::Static).unwrap();
        let result = d.buffer_data(b, &[0; 6], BufferUsage::Static);

        assert_eq!(Err(code::OUT_OF_MEMORY), result);
        assert_eq!(6, d.memory_used());

        d.buffer_data(a, &[0; 2], BufferUsage::Static).unwrap();
        d.buffer_data(b, &[0; 6], BufferUsage::Static).unwrap();
        assert_eq!(8, d.memory_used());
    }

    #[test]
    fn texture_image_validates_sizes() {
        let mut d = driver();
        let name = d.create_texture().unwrap();

        assert_eq!(Ok((0, 0)), d.texture_size(name, 0));
        assert_eq!(
            Err(code::INVALID_VALUE),
            d.texture_image(name, 0, 4, TextureFormat::Rgba8Unorm, None)
        );
        assert_eq!(
            Err(code::INVALID_VALUE),
            d.texture_image(name, 9000, 4, TextureFormat::Rgba8Unorm, None)
        );
        assert_eq!(
            Err(code::INVALID_VALUE),
            d.texture_image(name, 2, 2, TextureFormat::Rgba8Unorm, Some(&[0; 15]))
        );

        d.texture_image(name, 2, 2, TextureFormat::R8Unorm, None)
            .unwrap();
        assert_eq!(Ok((2, 2)), d.texture_size(name, 0));
        assert_eq!(Ok(TextureFormat::R8Unorm), d.texture_format(name));
    }

    #[test]
    fn texture_sub_image_writes_rows() {
        let mut d = driver();
        let name = d.create_texture().unwrap();
        d.texture_image(name, 3, 2, TextureFormat::R8Unorm, None)
            .unwrap();

        d.texture_sub_image(name, TextureRegion::new(1, 0, 2, 2), &[1, 2, 3, 4])
            .unwrap();

        assert_eq!(vec![0, 1, 2, 0, 3, 4], d.texture(name).unwrap().levels[0].pixels);
        assert_eq!(
            Err(code::INVALID_VALUE),
            d.texture_sub_image(name, TextureRegion::new(2, 0, 2, 1), &[0, 0])
        );
    }

    #[test]
    fn mipmaps_need_a_base_level() {
        let mut d = driver();
        let name = d.create_texture().unwrap();

        assert_eq!(Err(code::INVALID_OPERATION), d.generate_mipmaps(name));

        d.texture_image(name, 8, 4, TextureFormat::Rgba8Unorm, None)
            .unwrap();
        d.generate_mipmaps(name).unwrap();

        assert_eq!(Ok(4), d.texture_levels(name));
        assert_eq!(Ok((1, 1)), d.texture_size(name, 3));
        assert_eq!(Err(code::INVALID_VALUE), d.texture_size(name, 4));
    }

    #[test]
    fn texture_units_are_bounded() {
        let mut d = driver();
        let name = d.create_texture().unwrap();

        d.bind_texture(15, name).unwrap();

        assert_eq!(Ok(name), d.bound_texture(15));
        assert_eq!(Err(code::INVALID_VALUE), d.bind_texture(16, name));
    }

    #[test]
    fn check_source_reports_unbalanced_delimiters_with_lines() {
        let source = "@vertex\nfn vs_main() {\n    let a = (1.0;\n}\n";

        let log = check_source(ShaderStage::Vertex, source).unwrap_err();

        assert!(log.contains("4: error: '}' does not close '(' opened at line 3"));
    }

    #[test]
    fn check_source_requires_the_stage_attribute() {
        let log = check_source(ShaderStage::Fragment, VERTEX).unwrap_err();

        assert_eq!("error: no @fragment entry point found", log);
        assert!(check_source(ShaderStage::Vertex, VERTEX).is_ok());
        assert!(check_source(ShaderStage::Fragment, FRAGMENT).is_ok());
        assert!(check_source(ShaderStage::Vertex, "  \n").is_err());
    }

    #[test]
    fn link_requires_one_compiled_shader_per_stage() {
        let mut d = driver();
        let vs = d.create_shader(ShaderStage::Vertex).unwrap();
        let fs = d.create_shader(ShaderStage::Fragment).unwrap();
        let program = d.create_program().unwrap();
        d.shader_source(vs, VERTEX).unwrap();
        d.shader_source(fs, FRAGMENT).unwrap();
        d.compile_shader(vs, check_source).unwrap();

        d.attach_shader(program, vs).unwrap();
        assert_eq!(Err(code::INVALID_OPERATION), d.attach_shader(program, vs));
        d.link_program(program, |_, _| Ok(())).unwrap();
        assert_eq!(Ok(false), d.program_linked(program));
        assert_eq!(
            Ok("error: no fragment shader attached".to_string()),
            d.program_info_log(program)
        );

        d.attach_shader(program, fs).unwrap();
        d.link_program(program, |_, _| Ok(())).unwrap();
        assert_eq!(
            Ok(format!("error: attached shader {fs} is not compiled")),
            d.program_info_log(program)
        );

        d.compile_shader(fs, check_source).unwrap();
        d.link_program(program, |v, f| {
            assert_eq!((vs, fs), (v, f));
            Ok(())
        })
        .unwrap();
        assert_eq!(Ok(true), d.program_linked(program));
    }

    #[test]
    fn use_program_requires_a_linked_program() {
        let mut d = driver();
        let program = d.create_program().unwrap();

        assert_eq!(Err(code::INVALID_OPERATION), d.use_program(program));
        assert_eq!(Err(code::INVALID_VALUE), d.use_program(program + 1));
        assert_eq!(Ok(()), d.use_program(0));
    }

    #[test]
    fn vertex_attributes_capture_the_vertex_buffer() {
        let mut d = driver();
        let vao = d.create_vertex_array().unwrap();
        let vbo = d.create_buffer().unwrap();
        let layout = VertexAttribute::floats(2, 8, 0);

        assert_eq!(Err(code::INVALID_OPERATION), d.vertex_attribute(0, layout));

        d.bind_vertex_array(vao).unwrap();
        assert_eq!(Err(code::INVALID_OPERATION), d.vertex_attribute(0, layout));

        d.bind_buffer(BufferTarget::Vertex, vbo).unwrap();
        d.vertex_attribute(0, layout).unwrap();
        d.set_attribute_enabled(0, true).unwrap();

        assert_eq!(
            Ok(Some(AttributeBinding {
                buffer: vbo,
                layout,
                enabled: true,
            })),
            d.attribute_binding(0)
        );
        assert_eq!(Ok(None), d.attribute_binding(1));
        assert_eq!(Err(code::INVALID_VALUE), d.attribute_binding(16));
        assert_eq!(
            Err(code::INVALID_VALUE),
            d.vertex_attribute(1, VertexAttribute::floats(5, 0, 0))
        );
    }

    #[test]
    fn defines_function_ignores_comments_and_prefixes() {
        assert!(defines_function("fn vs_main() {}", "vs_main"));
        assert!(!defines_function("// fn vs_main() {}", "vs_main"));
        assert!(!defines_function("fn vs_main_2() {}", "vs_main"));
    }
}
