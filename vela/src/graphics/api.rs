use crate::{context::Uid, sys::Window, Color, Error, NativeErrorKind};

/// Native graphics error codes, as reported by [`GraphicsApi::get_error`].
pub mod code {
    pub const NO_ERROR: u32 = 0;
    pub const INVALID_ENUM: u32 = 0x0500;
    pub const INVALID_VALUE: u32 = 0x0501;
    pub const INVALID_OPERATION: u32 = 0x0502;
    pub const STACK_OVERFLOW: u32 = 0x0503;
    pub const STACK_UNDERFLOW: u32 = 0x0504;
    pub const OUT_OF_MEMORY: u32 = 0x0505;
    pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;
}

pub(crate) fn error_kind(code: u32) -> NativeErrorKind {
    match code {
        code::INVALID_ENUM => NativeErrorKind::InvalidEnum,
        code::INVALID_VALUE => NativeErrorKind::InvalidValue,
        code::INVALID_OPERATION => NativeErrorKind::InvalidOperation,
        code::STACK_OVERFLOW => NativeErrorKind::StackOverflow,
        code::STACK_UNDERFLOW => NativeErrorKind::StackUnderflow,
        code::OUT_OF_MEMORY => NativeErrorKind::OutOfMemory,
        code::INVALID_FRAMEBUFFER_OPERATION => NativeErrorKind::InvalidFramebufferOperation,
        _ => NativeErrorKind::Unknown,
    }
}

pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// An object-name based graphics api with a sticky error flag.
///
/// Calls never fail directly. A failing call leaves the object untouched, returns a default
/// value and records an error code that the next [`get_error`](Self::get_error) returns. Only
/// the first error is kept until it is read.
pub trait GraphicsApi {
    fn get_error(&self) -> u32;

    /// Switches to the binding state of `context` and binds it to a window, or to no surface
    /// at all. Binding points and the error flag belong to the context, objects to the api.
    fn make_current(&self, context: Uid, window: Option<&Window>);

    /// Forgets the binding state of a destroyed context.
    fn release_context(&self, context: Uid);

    fn clear(&self, color: Color);

    // Buffers.
    fn create_buffer(&self) -> u32;
    fn delete_buffer(&self, name: u32);
    fn bind_buffer(&self, target: BufferTarget, name: u32);
    fn bound_buffer(&self, target: BufferTarget) -> u32;
    fn buffer_data(&self, name: u32, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&self, name: u32, offset: usize, data: &[u8]);
    fn read_buffer(&self, name: u32, offset: usize, out: &mut [u8]);
    fn buffer_size(&self, name: u32) -> usize;
    fn buffer_usage(&self, name: u32) -> BufferUsage;

    // Textures.
    fn create_texture(&self) -> u32;
    fn delete_texture(&self, name: u32);
    fn bind_texture(&self, unit: u32, name: u32);
    fn bound_texture(&self, unit: u32) -> u32;
    fn texture_image(
        &self,
        name: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Option<&[u8]>,
    );
    fn texture_sub_image(&self, name: u32, region: TextureRegion, pixels: &[u8]);
    fn texture_size(&self, name: u32, level: u32) -> (u32, u32);
    fn texture_format(&self, name: u32) -> TextureFormat;
    fn set_texture_filter(&self, name: u32, min: TextureFilter, mag: TextureFilter);
    fn texture_filter(&self, name: u32) -> (TextureFilter, TextureFilter);
    fn set_texture_wrap(&self, name: u32, s: TextureWrap, t: TextureWrap);
    fn texture_wrap(&self, name: u32) -> (TextureWrap, TextureWrap);
    fn generate_mipmaps(&self, name: u32);
    fn texture_levels(&self, name: u32) -> u32;

    // Shaders and programs.
    fn create_shader(&self, stage: ShaderStage) -> u32;
    fn delete_shader(&self, name: u32);
    fn shader_source(&self, name: u32, source: &str);
    fn compile_shader(&self, name: u32);
    fn shader_compiled(&self, name: u32) -> bool;
    fn shader_info_log(&self, name: u32) -> String;
    fn shader_stage(&self, name: u32) -> ShaderStage;

    fn create_program(&self) -> u32;
    fn delete_program(&self, name: u32);
    fn attach_shader(&self, program: u32, shader: u32);
    fn detach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, name: u32);
    fn program_linked(&self, name: u32) -> bool;
    fn program_info_log(&self, name: u32) -> String;
    fn use_program(&self, name: u32);
    fn current_program(&self) -> u32;

    // Vertex arrays. Attribute calls act on the bound vertex array.
    fn create_vertex_array(&self) -> u32;
    fn delete_vertex_array(&self, name: u32);
    fn bind_vertex_array(&self, name: u32);
    fn bound_vertex_array(&self) -> u32;
    /// Points attribute `index` at the buffer bound to [`BufferTarget::Vertex`].
    fn vertex_attribute(&self, index: u32, layout: VertexAttribute);
    fn set_attribute_enabled(&self, index: u32, enabled: bool);
    fn attribute_binding(&self, index: u32) -> Option<AttributeBinding>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    #[default]
    Vertex,
    Index,
    Uniform,
    CopyRead,
    CopyWrite,
}

impl BufferTarget {
    pub const COUNT: usize = 5;

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Index => 1,
            Self::Uniform => 2,
            Self::CopyRead => 3,
            Self::CopyWrite => 4,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    #[default]
    Rgba8Unorm,
    Bgra8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm => 2,
            Self::Rgba8Unorm | Self::Bgra8Unorm => 4,
        }
    }

    /// A single pixel of `color` in this format.
    pub fn encode(self, color: Color) -> Vec<u8> {
        let [r, g, b, a] = color.to_rgba8();
        match self {
            Self::R8Unorm => vec![r],
            Self::Rg8Unorm => vec![r, g],
            Self::Rgba8Unorm => vec![r, g, b, a],
            Self::Bgra8Unorm => vec![b, g, r, a],
        }
    }
}

impl From<TextureFormat> for wgpu::TextureFormat {
    fn from(format: TextureFormat) -> Self {
        match format {
            TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        }
    }
}

impl TryFrom<wgpu::TextureFormat> for TextureFormat {
    type Error = Error;

    fn try_from(format: wgpu::TextureFormat) -> Result<Self, Self::Error> {
        match format {
            wgpu::TextureFormat::R8Unorm => Ok(TextureFormat::R8Unorm),
            wgpu::TextureFormat::Rg8Unorm => Ok(TextureFormat::Rg8Unorm),
            wgpu::TextureFormat::Rgba8Unorm => Ok(TextureFormat::Rgba8Unorm),
            wgpu::TextureFormat::Bgra8Unorm => Ok(TextureFormat::Bgra8Unorm),
            _ => Err(Error::Gpu(format!("unsupported texture format {format:?}"))),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

impl From<TextureFilter> for wgpu::FilterMode {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl From<TextureWrap> for wgpu::AddressMode {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
            TextureWrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// A rectangle of one mip level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRegion {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            level: 0,
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    #[default]
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => VERTEX_ENTRY_POINT,
            Self::Fragment => FRAGMENT_ENTRY_POINT,
        }
    }

    pub(crate) fn attribute(self) -> &'static str {
        match self {
            Self::Vertex => "@vertex",
            Self::Fragment => "@fragment",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    #[default]
    F32,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl AttributeType {
    pub fn size(self) -> u32 {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 | Self::U32 | Self::I32 => 4,
        }
    }
}

/// Layout of one vertex attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub components: u8,
    pub kind: AttributeType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u64,
}

impl VertexAttribute {
    pub fn floats(components: u8, stride: u32, offset: u64) -> Self {
        Self {
            components,
            kind: AttributeType::F32,
            normalized: false,
            stride,
            offset,
        }
    }
}

impl Default for VertexAttribute {
    fn default() -> Self {
        Self::floats(4, 0, 0)
    }
}

/// Where a vertex array reads an attribute from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    pub buffer: u32,
    pub layout: VertexAttribute,
    pub enabled: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_codes_translate() {
        assert_eq!(NativeErrorKind::InvalidEnum, error_kind(code::INVALID_ENUM));
        assert_eq!(NativeErrorKind::OutOfMemory, error_kind(code::OUT_OF_MEMORY));
        assert_eq!(
            NativeErrorKind::InvalidFramebufferOperation,
            error_kind(code::INVALID_FRAMEBUFFER_OPERATION)
        );
        assert_eq!(NativeErrorKind::Unknown, error_kind(0x1234));
    }

    #[test]
    fn encode_swizzles_per_format() {
        let color = Color::rgba(1.0, 0.0, 0.0, 1.0);

        assert_eq!(vec![255, 0, 0, 255], TextureFormat::Rgba8Unorm.encode(color));
        assert_eq!(vec![0, 0, 255, 255], TextureFormat::Bgra8Unorm.encode(color));
        assert_eq!(vec![255], TextureFormat::R8Unorm.encode(color));
    }

    #[test]
    fn wgpu_formats_round_trip_or_reject() {
        let format: wgpu::TextureFormat = TextureFormat::Rg8Unorm.into();

        assert_eq!(
            TextureFormat::Rg8Unorm,
            TextureFormat::try_from(format).unwrap()
        );
        assert!(TextureFormat::try_from(wgpu::TextureFormat::Depth32Float).is_err());
    }
}
