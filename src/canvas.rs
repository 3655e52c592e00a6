use image::RgbaImage;

use crate::hashing::fnv1a64;
use crate::palette::Rgb;

/// Opaque RGBA pixel buffer the compositor draws into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut pixels = vec![255_u8; (width as usize) * (height as usize) * 4];
        for pixel in pixels.chunks_exact_mut(4) {
            pixel[..3].copy_from_slice(&background);
        }
        Self {
            width,
            height,
            pixels,
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

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let idx = self.index(x, y);
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    pub fn hash(&self) -> u64 {
        fnv1a64(&self.pixels)
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn from_image(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.as_raw().clone(),
        }
    }

    pub fn blend(&mut self, x: u32, y: u32, src: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        blend_pixel(&mut self.pixels, idx, src);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: [u8; 4]) {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = x0.saturating_add(rect.w).min(self.width);
        let y1 = y0.saturating_add(rect.h).min(self.height);

        for yy in y0..y1 {
            for xx in x0..x1 {
                let idx = self.index(xx, yy);
                blend_pixel(&mut self.pixels, idx, color);
            }
        }
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: u32, color: [u8; 4]) {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = x0.saturating_add(rect.w).min(self.width);
        let y1 = y0.saturating_add(rect.h).min(self.height);
        let radius = radius.min(rect.w / 2).min(rect.h / 2);

        for yy in y0..y1 {
            for xx in x0..x1 {
                if rounded_rect_contains(xx, yy, rect, radius) {
                    let idx = self.index(xx, yy);
                    blend_pixel(&mut self.pixels, idx, color);
                }
            }
        }
    }

    pub fn draw_hline(&mut self, y: u32, color: [u8; 4]) {
        self.fill_rect(
            Rect {
                x: 0,
                y,
                w: self.width,
                h: 1,
            },
            color,
        );
    }
}

pub fn blend_pixel(frame: &mut [u8], idx: usize, src: [u8; 4]) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255_u16.saturating_sub(alpha);
    for channel in 0..3 {
        let dst = u16::from(frame[idx + channel]);
        let src_c = u16::from(src[channel]);
        frame[idx + channel] = ((src_c * alpha + dst * inv_alpha + 127) / 255) as u8;
    }
    frame[idx + 3] = 255;
}

pub fn scale_rgb(color: Rgb, factor: f32) -> Rgb {
    color.map(|channel| (f32::from(channel) * factor).clamp(0.0, 255.0) as u8)
}

/// BT.709 luma, rounded to nearest.
pub fn luma(color: Rgb) -> u8 {
    let weighted =
        2126 * u32::from(color[0]) + 7152 * u32::from(color[1]) + 722 * u32::from(color[2]);
    ((weighted + 5_000) / 10_000) as u8
}

fn rounded_rect_contains(x: u32, y: u32, rect: Rect, radius: u32) -> bool {
    if rect.w == 0 || rect.h == 0 {
        return false;
    }
    if radius == 0 {
        return x >= rect.x
            && x < rect.x.saturating_add(rect.w)
            && y >= rect.y
            && y < rect.y.saturating_add(rect.h);
    }

    let left = rect.x;
    let right = rect.x + rect.w - 1;
    let top = rect.y;
    let bottom = rect.y + rect.h - 1;

    if x >= left.saturating_add(radius)
        && x <= right.saturating_sub(radius)
        && y >= top
        && y <= bottom
    {
        return true;
    }
    if y >= top.saturating_add(radius)
        && y <= bottom.saturating_sub(radius)
        && x >= left
        && x <= right
    {
        return true;
    }

    let corners = [
        (left + radius, top + radius),
        (right.saturating_sub(radius), top + radius),
        (left + radius, bottom.saturating_sub(radius)),
        (right.saturating_sub(radius), bottom.saturating_sub(radius)),
    ];
    let radius_sq = (radius as i64) * (radius as i64);
    corners.into_iter().any(|(cx, cy)| {
        let dx = x as i64 - cx as i64;
        let dy = y as i64 - cy as i64;
        dx * dx + dy * dy <= radius_sq
    })
}

#[cfg(test)]
mod tests {
    use super::{luma, scale_rgb, Canvas, Rect};

    #[test]
    fn new_canvas_is_filled_and_opaque() {
        let canvas = Canvas::new(3, 2, [13, 13, 18]);
        assert_eq!(canvas.pixels().len(), 24);
        for pixel in canvas.pixels().chunks_exact(4) {
            assert_eq!(pixel, &[13, 13, 18, 255]);
        }
    }

    #[test]
    fn opaque_fill_replaces_and_clips() {
        let mut canvas = Canvas::new(4, 4, [0, 0, 0]);
        canvas.fill_rect(
            Rect {
                x: 2,
                y: 2,
                w: 10,
                h: 10,
            },
            [255, 0, 0, 255],
        );
        assert_eq!(canvas.pixel(3, 3), [255, 0, 0]);
        assert_eq!(canvas.pixel(1, 1), [0, 0, 0]);
    }

    #[test]
    fn rounded_rect_skips_corners() {
        let mut canvas = Canvas::new(20, 20, [0, 0, 0]);
        let rect = Rect {
            x: 2,
            y: 2,
            w: 12,
            h: 10,
        };
        canvas.fill_rounded_rect(rect, 4, [20, 20, 28, 255]);
        assert_eq!(canvas.pixel(2, 2), [0, 0, 0]);
        assert_eq!(canvas.pixel(8, 6), [20, 20, 28]);
        assert_eq!(canvas.pixel(2, 7), [20, 20, 28]);
    }

    #[test]
    fn half_alpha_blend_rounds() {
        let mut canvas = Canvas::new(1, 1, [0, 0, 0]);
        canvas.blend(0, 0, [255, 100, 0, 128]);
        assert_eq!(canvas.pixel(0, 0), [128, 50, 0]);
        canvas.blend(5, 5, [255, 255, 255, 255]);
    }

    #[test]
    fn color_helpers() {
        assert_eq!(scale_rgb([200, 100, 10], 0.5), [100, 50, 5]);
        assert_eq!(scale_rgb([200, 200, 200], 2.0), [255, 255, 255]);
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert!(luma([0, 255, 0]) > luma([255, 0, 0]));
    }
}
