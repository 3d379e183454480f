use std::{ops::Range, path::Path};

use fontdue::FontSettings;
use glam::{vec2, Vec2};

use crate::{
    graphics::{Texture, TextureFilter, TextureFormat},
    os, Error, VelaResult,
};

const MIN_ATLAS_SIZE: u32 = 128;
const MAX_ATLAS_SIZE: u32 = 4096;
// Gap between glyphs so linear filtering does not bleed.
const SPACING: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharSet {
    pub from: u32,
    pub to: u32,
}

impl CharSet {
    /// Printable ASCII.
    pub const ASCII: Self = Self::new(32..127);

    pub const fn new(range: Range<u32>) -> Self {
        Self {
            from: range.start,
            to: range.end,
        }
    }

    /// Every valid `char` in the set.
    pub fn chars(self) -> impl Iterator<Item = char> {
        (self.from..self.to).filter_map(char::from_u32)
    }
}

pub struct Font {
    font: fontdue::Font,
}

impl Font {
    pub fn from_bytes(data: &[u8]) -> VelaResult<Self> {
        let font = fontdue::Font::from_bytes(data, FontSettings::default()).map_err(Error::Font)?;
        Ok(Self { font })
    }

    pub fn load(path: impl AsRef<Path>) -> VelaResult<Self> {
        Self::from_bytes(&os::read_file(path.as_ref())?)
    }

    /// Rasterises `charset` at `size` pixels onto one atlas texture in the current graphics
    /// context.
    pub fn bake(&self, size: f32, charset: CharSet) -> VelaResult<FontAtlas> {
        let line_metrics = self
            .font
            .horizontal_line_metrics(size)
            .ok_or(Error::Font("font has no horizontal line metrics"))?;

        let mut glyphs = Vec::new();
        let mut bitmaps = Vec::new();
        for c in charset.chars() {
            if !self.font.has_glyph(c) {
                continue;
            }

            let (metrics, bitmap) = self.font.rasterize(c, size);
            glyphs.push(Glyph {
                codepoint: c,
                advance: f32::ceil(metrics.advance_width),
                offset: vec2(
                    f32::floor(metrics.bounds.xmin),
                    f32::floor(-metrics.bounds.height - metrics.bounds.ymin),
                ),
                size: vec2(metrics.width as f32, metrics.height as f32),
                ..Default::default()
            });
            bitmaps.push((metrics.width as u32, metrics.height as u32, bitmap));
        }

        let sizes: Vec<_> = bitmaps.iter().map(|(w, h, _)| (*w, *h)).collect();
        let (atlas_size, positions) = layout_rows(&sizes, MAX_ATLAS_SIZE)
            .ok_or(Error::Font("glyphs do not fit on one atlas page"))?;

        let stride = atlas_size as usize;
        let mut pixels = vec![0; stride * stride];
        for ((glyph, (width, height, bitmap)), (x, y)) in
            glyphs.iter_mut().zip(&bitmaps).zip(&positions)
        {
            let width = *width as usize;
            for row in 0..*height as usize {
                let from = row * width;
                let to = (*y as usize + row) * stride + *x as usize;
                pixels[to..to + width].copy_from_slice(&bitmap[from..from + width]);
            }

            let scale = atlas_size as f32;
            glyph.uv_min = vec2(*x as f32, *y as f32) / scale;
            glyph.uv_max = glyph.uv_min + glyph.size / scale;
        }

        let texture = Texture::new()?;
        texture.upload(atlas_size, atlas_size, TextureFormat::R8Unorm, &pixels)?;
        texture.set_filter(TextureFilter::Linear, TextureFilter::Linear)?;

        let mut kernings = Vec::new();
        for a in glyphs.iter().map(|g| g.codepoint) {
            for b in glyphs.iter().map(|g| g.codepoint) {
                if let Some(value) = self.font.horizontal_kern(a, b, size) {
                    kernings.push(Kerning { a, b, value });
                }
            }
        }

        log::debug!(
            "baked {} glyphs at {size}px into a {atlas_size}x{atlas_size} atlas",
            glyphs.len()
        );

        Ok(FontAtlas {
            size,
            ascent: f32::ceil(line_metrics.ascent),
            descent: f32::ceil(line_metrics.descent),
            line_gap: f32::ceil(line_metrics.line_gap),
            line_height: f32::ceil(line_metrics.new_line_size),
            glyphs,
            kernings,
            texture,
        })
    }
}

/// Places rectangles left to right in rows on the smallest square page, doubling from
/// [`MIN_ATLAS_SIZE`] up to `max`, that holds them all.
fn layout_rows(sizes: &[(u32, u32)], max: u32) -> Option<(u32, Vec<(u32, u32)>)> {
    let mut size = MIN_ATLAS_SIZE.min(max);
    loop {
        if let Some(positions) = try_layout(sizes, size) {
            return Some((size, positions));
        }
        if size >= max {
            return None;
        }
        size = (size * 2).min(max);
    }
}

fn try_layout(sizes: &[(u32, u32)], size: u32) -> Option<Vec<(u32, u32)>> {
    let mut positions = Vec::with_capacity(sizes.len());
    let (mut x, mut y, mut row_height) = (SPACING, SPACING, 0);

    for &(width, height) in sizes {
        if x + width + SPACING > size {
            x = SPACING;
            y += row_height + SPACING;
            row_height = 0;
        }
        if x + width + SPACING > size || y + height + SPACING > size {
            return None;
        }

        positions.push((x, y));
        x += width + SPACING;
        row_height = row_height.max(height);
    }

    Some(positions)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub codepoint: char,
    pub advance: f32,
    /// From the pen position to the top left of the bitmap.
    pub offset: Vec2,
    /// Bitmap size in pixels.
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Kerning {
    a: char,
    b: char,
    value: f32,
}

/// Glyph metrics of one font size and the texture holding its bitmaps.
#[derive(Debug)]
pub struct FontAtlas {
    size: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    line_height: f32,
    // Sorted by codepoint.
    glyphs: Vec<Glyph>,
    // Sorted by pair.
    kernings: Vec<Kerning>,
    texture: Texture,
}

impl FontAtlas {
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn glyph(&self, codepoint: char) -> Option<&Glyph> {
        self.glyphs
            .binary_search_by_key(&codepoint, |g| g.codepoint)
            .ok()
            .map(|index| &self.glyphs[index])
    }

    pub fn advance(&self, codepoint: char) -> f32 {
        self.glyph(codepoint).map_or(0.0, |g| g.advance)
    }

    pub fn kerning(&self, a: char, b: char) -> f32 {
        self.kernings
            .binary_search_by(|k| (k.a, k.b).cmp(&(a, b)))
            .map_or(0.0, |index| self.kernings[index].value)
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn descent(&self) -> f32 {
        self.descent
    }

    pub fn line_gap(&self) -> f32 {
        self.line_gap
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn height(&self) -> f32 {
        self.ascent - self.descent
    }

    /// Width of the widest line of `text`.
    pub fn width_of(&self, text: &str) -> f32 {
        text.lines()
            .map(|line| self.width_of_line(line))
            .fold(0.0, f32::max)
    }

    fn width_of_line(&self, line: &str) -> f32 {
        let mut width = 0.0;
        let mut last = None;
        for c in line.chars() {
            width += self.advance(c);
            if let Some(last) = last {
                width += self.kerning(last, c);
            }
            last = Some(c);
        }
        width
    }

    pub fn height_of(&self, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }

        let lines = 1 + text.chars().filter(|c| *c == '\n').count();
        lines as f32 * self.line_height - self.line_gap
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn atlas() -> FontAtlas {
        let glyph = |codepoint, advance| Glyph {
            codepoint,
            advance,
            ..Default::default()
        };

        FontAtlas {
            size: 16.0,
            ascent: 12.0,
            descent: -4.0,
            line_gap: 2.0,
            line_height: 18.0,
            glyphs: vec![glyph('A', 10.0), glyph('V', 9.0), glyph('a', 8.0)],
            kernings: vec![
                Kerning {
                    a: 'A',
                    b: 'V',
                    value: -2.0,
                },
                Kerning {
                    a: 'V',
                    b: 'A',
                    value: -1.0,
                },
            ],
            texture: Texture::default(),
        }
    }

    #[test]
    fn charsets_skip_invalid_codepoints() {
        assert_eq!(95, CharSet::ASCII.chars().count());
        assert_eq!(2, CharSet::new(0xd7ff..0xe001).chars().count());
    }

    #[test]
    fn lookups() {
        let atlas = atlas();

        assert_eq!(9.0, atlas.advance('V'));
        assert_eq!(0.0, atlas.advance('z'));
        assert_eq!(-2.0, atlas.kerning('A', 'V'));
        assert_eq!(-1.0, atlas.kerning('V', 'A'));
        assert_eq!(0.0, atlas.kerning('A', 'a'));
        assert!(atlas.glyph('a').is_some());
        assert_eq!(16.0, atlas.height());
    }

    #[test]
    fn measuring_text() {
        let atlas = atlas();

        assert_eq!(17.0, atlas.width_of("AV"));
        assert_eq!(26.0, atlas.width_of("a\nAVA\n"));
        assert_eq!(0.0, atlas.height_of(""));
        assert_eq!(16.0, atlas.height_of("A"));
        assert_eq!(34.0, atlas.height_of("A\nV"));
    }

    #[test]
    fn rows_wrap_and_pages_grow() {
        let (size, positions) = layout_rows(&[(60, 10), (60, 20), (10, 5)], 4096).unwrap();

        assert_eq!(128, size);
        assert_eq!(vec![(1, 1), (62, 1), (1, 22)], positions);

        let (size, _) = layout_rows(&[(200, 10)], 4096).unwrap();
        assert_eq!(256, size);
    }

    #[test]
    fn oversized_glyphs_do_not_fit() {
        assert_eq!(None, layout_rows(&[(300, 300)], 256));
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(matches!(
            Font::from_bytes(b"not a font"),
            Err(Error::Font(_))
        ));
    }
}
