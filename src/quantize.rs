//! Median-cut palette reduction.
//!
//! Colors are histogrammed, then the box with the widest channel range is
//! split at its pixel-weighted median until `max_colors` boxes exist or no box
//! can be split further. Each box becomes one palette entry (its weighted
//! mean). All ordering is by value, so the result depends only on the pixels.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};

use crate::canvas::Canvas;
use crate::palette::Rgb;

pub const MIN_COLORS: usize = 2;
pub const MAX_COLORS: usize = 256;

/// A canvas reduced to at most 256 colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedCanvas {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<Rgb>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
}

impl IndexedCanvas {
    pub fn palette_bytes(&self) -> Vec<u8> {
        self.palette.iter().flatten().copied().collect()
    }

    pub fn color_at(&self, x: u32, y: u32) -> Rgb {
        let index = self.indices[(y as usize) * (self.width as usize) + x as usize];
        self.palette[usize::from(index)]
    }
}

#[derive(Debug, Clone)]
struct ColorBox {
    /// `(color, pixel count)`, never empty.
    entries: Vec<(Rgb, u32)>,
}

impl ColorBox {
    fn channel_range(&self, channel: usize) -> u8 {
        let (min, max) = self
            .entries
            .iter()
            .fold((u8::MAX, u8::MIN), |(min, max), (color, _)| {
                (min.min(color[channel]), max.max(color[channel]))
            });
        max - min
    }

    /// Widest channel and its range; lower channel index wins ties.
    fn widest_channel(&self) -> (usize, u8) {
        (0..3)
            .map(|channel| (channel, self.channel_range(channel)))
            .fold((0, 0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    fn split(mut self) -> (ColorBox, ColorBox) {
        let (channel, _) = self.widest_channel();
        self.entries
            .sort_by_key(|(color, _)| (color[channel], *color));

        let total: u64 = self.entries.iter().map(|(_, count)| u64::from(*count)).sum();
        let mut running = 0_u64;
        let mut cut = 1;
        for (i, (_, count)) in self.entries.iter().enumerate() {
            running += u64::from(*count);
            if running * 2 >= total {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.entries.len() - 1);
        let upper = self.entries.split_off(cut);
        (self, ColorBox { entries: upper })
    }

    fn mean(&self) -> Rgb {
        let mut sums = [0_u64; 3];
        let mut total = 0_u64;
        for (color, count) in &self.entries {
            let count = u64::from(*count);
            for channel in 0..3 {
                sums[channel] += u64::from(color[channel]) * count;
            }
            total += count;
        }
        let total = total.max(1);
        sums.map(|sum| ((sum + total / 2) / total) as u8)
    }
}

pub fn quantize(canvas: &Canvas, max_colors: usize) -> Result<IndexedCanvas> {
    if !(MIN_COLORS..=MAX_COLORS).contains(&max_colors) {
        bail!(
            "max_colors must be within {}..={}, got {}",
            MIN_COLORS,
            MAX_COLORS,
            max_colors
        );
    }

    let mut histogram: BTreeMap<Rgb, u32> = BTreeMap::new();
    for pixel in canvas.pixels().chunks_exact(4) {
        *histogram.entry([pixel[0], pixel[1], pixel[2]]).or_insert(0) += 1;
    }

    let (palette, lookup) = if histogram.len() <= max_colors {
        let palette = histogram.keys().copied().collect::<Vec<_>>();
        let lookup = palette
            .iter()
            .enumerate()
            .map(|(index, color)| (*color, index as u8))
            .collect::<HashMap<_, _>>();
        (palette, lookup)
    } else {
        let boxes = median_cut(histogram.into_iter().collect(), max_colors);
        let palette = boxes.iter().map(ColorBox::mean).collect::<Vec<_>>();
        let mut lookup = HashMap::new();
        for (index, color_box) in boxes.iter().enumerate() {
            for (color, _) in &color_box.entries {
                lookup.insert(*color, index as u8);
            }
        }
        (palette, lookup)
    };

    let indices = canvas
        .pixels()
        .chunks_exact(4)
        .map(|pixel| {
            lookup
                .get(&[pixel[0], pixel[1], pixel[2]])
                .copied()
                .unwrap_or(0)
        })
        .collect();

    Ok(IndexedCanvas {
        width: canvas.width(),
        height: canvas.height(),
        palette,
        indices,
    })
}

fn median_cut(entries: Vec<(Rgb, u32)>, max_colors: usize) -> Vec<ColorBox> {
    let mut boxes = vec![ColorBox { entries }];
    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, color_box)| color_box.entries.len() > 1)
            .map(|(index, color_box)| (index, color_box.widest_channel().1))
            .fold(None, |best: Option<(usize, u8)>, candidate| match best {
                Some(best) if best.1 >= candidate.1 => Some(best),
                _ => Some(candidate),
            });
        let Some((index, _)) = candidate else {
            break;
        };
        let (lower, upper) = boxes.remove(index).split();
        boxes.insert(index, upper);
        boxes.insert(index, lower);
    }
    boxes
}
