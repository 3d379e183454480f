use std::path::Path;

use crate::{os, VelaResult};

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Decodes any format the image crate recognises.
    pub fn from_bytes(data: &[u8]) -> VelaResult<Self> {
        let image = image::load_from_memory(data)?.into_rgba8();
        let (width, height) = image.dimensions();

        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> VelaResult<Self> {
        Self::from_bytes(&os::read_file(path.as_ref())?)
    }

    pub fn from_pixels(width: u32, height: u32, pixels: &[u8]) -> Self {
        assert_eq!(
            width as usize * height as usize * 4,
            pixels.len(),
            "pixel data does not match image size"
        );

        Self {
            width,
            height,
            pixels: pixels.to_vec(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decodes_png() {
        let mut source = image::RgbaImage::new(2, 1);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        source.put_pixel(1, 0, image::Rgba([0, 0, 255, 128]));
        let mut png = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let image = Image::from_bytes(&png).unwrap();

        assert_eq!(2, image.width());
        assert_eq!(1, image.height());
        assert_eq!(&[255, 0, 0, 255, 0, 0, 255, 128], image.pixels());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(
            Image::from_bytes(&[1, 2, 3]),
            Err(crate::Error::Image(_))
        ));
    }
}
