use crate::{
    check,
    graphics::{
        api::{GraphicsApi, TextureFilter, TextureFormat, TextureRegion, TextureWrap},
        Graphics,
    },
    handle::{Handle, HandleKind, Ownership},
    image::Image,
    Color, VelaResult,
};

pub enum TextureKind {}

impl HandleKind for TextureKind {
    type Domain = Graphics;

    const OWNERSHIP: Ownership = Ownership::Shared;
    const RESOURCE: &'static str = "texture";

    fn delete(api: &dyn GraphicsApi, name: u32) {
        api.delete_texture(name);
    }
}

/// A 2D texture with an optional mip chain.
#[derive(Debug, Default)]
pub struct Texture {
    handle: Handle<TextureKind>,
}

impl Texture {
    /// A texture name with no storage yet.
    pub fn new() -> VelaResult<Self> {
        let handle = Handle::<TextureKind>::allocate(|api| api.create_texture())?;
        Ok(Self { handle })
    }

    /// A zero filled texture.
    pub fn with_size(width: u32, height: u32, format: TextureFormat) -> VelaResult<Self> {
        let texture = Self::new()?;
        texture
            .handle
            .call(|api, name| api.texture_image(name, width, height, format, None))?;
        Ok(texture)
    }

    pub fn from_image(image: &Image) -> VelaResult<Self> {
        let texture = Self::new()?;
        texture.upload(
            image.width(),
            image.height(),
            TextureFormat::Rgba8Unorm,
            image.pixels(),
        )?;
        Ok(texture)
    }

    /// Replaces the texture's storage. Any mip chain is discarded.
    pub fn upload(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) -> VelaResult {
        self.handle
            .call(|api, name| api.texture_image(name, width, height, format, Some(pixels)))
    }

    pub fn update(&self, region: TextureRegion, pixels: &[u8]) -> VelaResult {
        self.handle
            .call(|api, name| api.texture_sub_image(name, region, pixels))
    }

    /// Sets every pixel of the base level to `color`.
    pub fn fill(&self, color: Color) -> VelaResult {
        let (width, height) = self.size()?;
        let format = self.format()?;
        let pixels = format
            .encode(color)
            .repeat(width as usize * height as usize);
        self.update(TextureRegion::new(0, 0, width, height), &pixels)
    }

    /// Size of the base level, `(0, 0)` before any storage is allocated.
    pub fn size(&self) -> VelaResult<(u32, u32)> {
        self.level_size(0)
    }

    pub fn level_size(&self, level: u32) -> VelaResult<(u32, u32)> {
        self.handle.call(|api, name| api.texture_size(name, level))
    }

    pub fn format(&self) -> VelaResult<TextureFormat> {
        self.handle.call(|api, name| api.texture_format(name))
    }

    pub fn bind(&self, unit: u32) -> VelaResult {
        self.handle.call(|api, name| api.bind_texture(unit, name))
    }

    pub fn unbind(unit: u32) -> VelaResult {
        check::call_current::<Graphics, _>(|api| api.bind_texture(unit, 0))
    }

    pub fn is_bound(&self, unit: u32) -> VelaResult<bool> {
        self.handle
            .call(|api, name| api.bound_texture(unit) == name)
    }

    pub fn set_filter(&self, min: TextureFilter, mag: TextureFilter) -> VelaResult {
        self.handle
            .call(|api, name| api.set_texture_filter(name, min, mag))
    }

    /// The `(min, mag)` filters.
    pub fn filter(&self) -> VelaResult<(TextureFilter, TextureFilter)> {
        self.handle.call(|api, name| api.texture_filter(name))
    }

    pub fn set_wrap(&self, s: TextureWrap, t: TextureWrap) -> VelaResult {
        self.handle
            .call(|api, name| api.set_texture_wrap(name, s, t))
    }

    pub fn wrap(&self) -> VelaResult<(TextureWrap, TextureWrap)> {
        self.handle.call(|api, name| api.texture_wrap(name))
    }

    pub fn generate_mipmaps(&self) -> VelaResult {
        self.handle.call(|api, name| api.generate_mipmaps(name))
    }

    pub fn mip_levels(&self) -> VelaResult<u32> {
        self.handle.call(|api, name| api.texture_levels(name))
    }

    pub fn handle(&self) -> &Handle<TextureKind> {
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
