/// One level of a texture's mip chain, tightly packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Level {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u8>,
}

impl Level {
    pub(crate) fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * bytes_per_pixel],
        }
    }
}

/// Number of levels in a full chain down to 1x1.
pub(crate) fn level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Box filters `base` down to 1x1. The result starts with `base`.
pub(crate) fn chain(base: Level, bytes_per_pixel: usize) -> Vec<Level> {
    let count = level_count(base.width, base.height) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);

    while levels.len() < count {
        let next = downsample(&levels[levels.len() - 1], bytes_per_pixel);
        levels.push(next);
    }

    levels
}

fn downsample(src: &Level, bpp: usize) -> Level {
    let mut dst = Level::new((src.width / 2).max(1), (src.height / 2).max(1), bpp);
    let src_stride = src.width as usize * bpp;
    let dst_stride = dst.width as usize * bpp;

    for y in 0..dst.height as usize {
        let y0 = (y * 2).min(src.height as usize - 1);
        let y1 = (y * 2 + 1).min(src.height as usize - 1);
        for x in 0..dst.width as usize {
            let x0 = (x * 2).min(src.width as usize - 1);
            let x1 = (x * 2 + 1).min(src.width as usize - 1);
            for c in 0..bpp {
                let sum = src.pixels[y0 * src_stride + x0 * bpp + c] as u32
                    + src.pixels[y0 * src_stride + x1 * bpp + c] as u32
                    + src.pixels[y1 * src_stride + x0 * bpp + c] as u32
                    + src.pixels[y1 * src_stride + x1 * bpp + c] as u32;
                dst.pixels[y * dst_stride + x * bpp + c] = ((sum + 2) / 4) as u8;
            }
        }
    }

    dst
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn level_count_covers_the_largest_side() {
        assert_eq!(1, level_count(1, 1));
        assert_eq!(3, level_count(4, 4));
        assert_eq!(4, level_count(8, 2));
        assert_eq!(9, level_count(256, 3));
    }

    #[test]
    fn chain_averages_down_to_one_pixel() {
        let base = Level {
            width: 2,
            height: 2,
            pixels: vec![0, 100, 200, 100],
        };

        let levels = chain(base, 1);

        assert_eq!(2, levels.len());
        assert_eq!(
            Level {
                width: 1,
                height: 1,
                pixels: vec![100],
            },
            levels[1]
        );
    }

    #[test]
    fn odd_sides_clamp_at_the_edge() {
        let base = Level {
            width: 3,
            height: 1,
            pixels: vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120],
        };

        let levels = chain(base, 4);

        assert_eq!(2, levels.len());
        assert_eq!(1, levels[1].width);
        assert_eq!(vec![30, 40, 50, 60], levels[1].pixels);
    }
}
