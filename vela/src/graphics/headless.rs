use std::cell::RefCell;

use crate::{
    context::Uid,
    graphics::{
        api::{
            AttributeBinding, BufferTarget, BufferUsage, GraphicsApi, ShaderStage, TextureFilter,
            TextureFormat, TextureRegion, TextureWrap, VertexAttribute,
        },
        driver::{check_source, Driver, DriverLimits},
    },
    sys::Window,
    Color,
};

/// A graphics api with no hardware behind it.
///
/// Every object lives in the driver's memory, so the whole api can be exercised without a GPU.
pub struct HeadlessGraphics {
    driver: RefCell<Driver>,
}

impl HeadlessGraphics {
    pub fn new(limits: DriverLimits) -> Self {
        Self {
            driver: RefCell::new(Driver::new(limits)),
        }
    }

    pub fn limits(&self) -> DriverLimits {
        self.driver.borrow().limits()
    }

    /// Bytes of buffer and texture storage in use.
    pub fn memory_used(&self) -> usize {
        self.driver.borrow().memory_used()
    }

    /// The window the api was last made current against.
    pub fn window(&self) -> Option<Uid> {
        self.driver.borrow().window()
    }

    pub fn clear_color(&self) -> Option<Color> {
        self.driver.borrow().clear_color()
    }

    fn run<T: Default>(&self, f: impl FnOnce(&mut Driver) -> Result<T, u32>) -> T {
        self.driver.borrow_mut().run(f)
    }
}

impl Default for HeadlessGraphics {
    fn default() -> Self {
        Self::new(DriverLimits::default())
    }
}

impl GraphicsApi for HeadlessGraphics {
    fn get_error(&self) -> u32 {
        self.driver.borrow_mut().take_error()
    }

    fn make_current(&self, context: Uid, window: Option<&Window>) {
        self.driver
            .borrow_mut()
            .make_current(context, window.map(Window::id));
    }

    fn release_context(&self, context: Uid) {
        self.driver.borrow_mut().release_context(context);
    }

    fn clear(&self, color: Color) {
        self.driver.borrow_mut().clear(color);
    }

    fn create_buffer(&self) -> u32 {
        self.run(|d| d.create_buffer())
    }

    fn delete_buffer(&self, name: u32) {
        self.run(|d| d.delete_buffer(name))
    }

    fn bind_buffer(&self, target: BufferTarget, name: u32) {
        self.run(|d| d.bind_buffer(target, name))
    }

    fn bound_buffer(&self, target: BufferTarget) -> u32 {
        self.run(|d| d.bound_buffer(target))
    }

    fn buffer_data(&self, name: u32, data: &[u8], usage: BufferUsage) {
        self.run(|d| d.buffer_data(name, data, usage))
    }

    fn buffer_sub_data(&self, name: u32, offset: usize, data: &[u8]) {
        self.run(|d| d.buffer_sub_data(name, offset, data))
    }

    fn read_buffer(&self, name: u32, offset: usize, out: &mut [u8]) {
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
        self.run(|d| d.delete_texture(name))
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
        self.run(|d| d.texture_image(name, width, height, format, pixels))
    }

    fn texture_sub_image(&self, name: u32, region: TextureRegion, pixels: &[u8]) {
        self.run(|d| d.texture_sub_image(name, region, pixels))
    }

    fn texture_size(&self, name: u32, level: u32) -> (u32, u32) {
        self.run(|d| d.texture_size(name, level))
    }

    fn texture_format(&self, name: u32) -> TextureFormat {
        self.run(|d| d.texture_format(name))
    }

    fn set_texture_filter(&self, name: u32, min: TextureFilter, mag: TextureFilter) {
        self.run(|d| d.set_texture_filter(name, min, mag))
    }

    fn texture_filter(&self, name: u32) -> (TextureFilter, TextureFilter) {
        self.run(|d| d.texture_filter(name))
    }

    fn set_texture_wrap(&self, name: u32, s: TextureWrap, t: TextureWrap) {
        self.run(|d| d.set_texture_wrap(name, s, t))
    }

    fn texture_wrap(&self, name: u32) -> (TextureWrap, TextureWrap) {
        self.run(|d| d.texture_wrap(name))
    }

    fn generate_mipmaps(&self, name: u32) {
        self.run(|d| d.generate_mipmaps(name))
    }

    fn texture_levels(&self, name: u32) -> u32 {
        self.run(|d| d.texture_levels(name))
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        self.run(|d| d.create_shader(stage))
    }

    fn delete_shader(&self, name: u32) {
        self.run(|d| d.delete_shader(name))
    }

    fn shader_source(&self, name: u32, source: &str) {
        self.run(|d| d.shader_source(name, source))
    }

    fn compile_shader(&self, name: u32) {
        self.run(|d| d.compile_shader(name, check_source))
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
        self.run(|d| d.delete_program(name))
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.run(|d| d.attach_shader(program, shader))
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.run(|d| d.detach_shader(program, shader))
    }

    fn link_program(&self, name: u32) {
        self.run(|d| d.link_program(name, |_, _| Ok(())))
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::api::code;

    #[test]
    fn failed_calls_return_defaults_and_set_the_flag() {
        let api = HeadlessGraphics::default();

        let size = api.buffer_size(42);

        assert_eq!(0, size);
        assert_eq!(code::INVALID_OPERATION, api.get_error());
        assert_eq!(code::NO_ERROR, api.get_error());
    }

    #[test]
    fn make_current_records_the_window() {
        let api = HeadlessGraphics::default();
        let window = Window::offscreen(4, 4);

        let context = Uid::next();

        api.make_current(context, Some(&window));
        assert_eq!(Some(window.id()), api.window());

        api.make_current(context, None);
        assert_eq!(None, api.window());
    }

    #[test]
    fn error_flags_and_bindings_are_per_context() {
        let api = HeadlessGraphics::default();
        let (a, b) = (Uid::next(), Uid::next());

        api.make_current(a, None);
        let buffer = api.create_buffer();
        api.bind_buffer(BufferTarget::Vertex, buffer);
        api.buffer_size(42);

        api.make_current(b, None);
        assert_eq!(code::NO_ERROR, api.get_error());
        assert_eq!(0, api.bound_buffer(BufferTarget::Vertex));

        api.make_current(a, None);
        assert_eq!(buffer, api.bound_buffer(BufferTarget::Vertex));
        assert_eq!(code::INVALID_OPERATION, api.get_error());
    }

    #[test]
    fn deleting_unbinds_in_every_context() {
        let api = HeadlessGraphics::default();
        let (a, b) = (Uid::next(), Uid::next());

        api.make_current(a, None);
        let texture = api.create_texture();
        api.bind_texture(0, texture);
        api.make_current(b, None);
        api.bind_texture(1, texture);

        api.delete_texture(texture);

        assert_eq!(0, api.bound_texture(1));
        api.make_current(a, None);
        assert_eq!(0, api.bound_texture(0));
    }

    #[test]
    fn released_contexts_start_over() {
        let api = HeadlessGraphics::default();
        let context = Uid::next();
        api.make_current(context, None);
        let vertex_array = api.create_vertex_array();
        api.bind_vertex_array(vertex_array);

        api.release_context(context);
        api.make_current(context, None);

        assert_eq!(0, api.bound_vertex_array());
    }

    #[test]
    fn compile_reports_the_log() {
        let api = HeadlessGraphics::default();
        let shader = api.create_shader(ShaderStage::Fragment);

        api.shader_source(shader, "@fragment fn fs_main( {");
        api.compile_shader(shader);

        assert!(!api.shader_compiled(shader));
        assert!(api.shader_info_log(shader).contains("unclosed"));
        assert_eq!(code::NO_ERROR, api.get_error());
    }
}
