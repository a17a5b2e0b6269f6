use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::Point2;
use image::{Rgb, RgbImage};

use crate::color::Color;
use crate::error::Result;
use crate::float::*;

/// f64 stored as bits for lock free accumulation
#[derive(Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn add(&self, value: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Default)]
struct Cell {
    rgb: [AtomicF64; 3],
}

impl Cell {
    fn add(&self, c: Color) {
        for (i, channel) in self.rgb.iter().enumerate() {
            channel.add(c[i].into());
        }
    }

    fn load(&self) -> Color {
        Color::new(
            self.rgb[0].load().to_float(),
            self.rgb[1].load().to_float(),
            self.rgb[2].load().to_float(),
        )
    }
}

/// Accumulation target shared by all render workers.
/// Pixel samples keep a running sum and count, splats are summed separately.
pub struct Film {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Cell>,
    counts: Vec<AtomicU64>,
    splats: Vec<Cell>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Film {
        let n = (width * height) as usize;
        Film {
            width,
            height,
            pixels: (0..n).map(|_| Cell::default()).collect(),
            counts: (0..n).map(|_| AtomicU64::new(0)).collect(),
            splats: (0..n).map(|_| Cell::default()).collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn add_color_sample(&self, x: u32, y: u32, c: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.pixels[i].add(c);
        self.counts[i].fetch_add(1, Ordering::Relaxed);
    }

    /// Add a contribution at an arbitrary film position.
    /// Positions outside the film are ignored.
    pub fn add_splat_sample(&self, raster: Point2<Float>, c: Color) {
        if !(raster.x >= 0.0 && raster.y >= 0.0) {
            return;
        }
        let x = raster.x.floor() as u32;
        let y = raster.y.floor() as u32;
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.splats[i].add(c);
    }

    pub fn sample_count(&self, x: u32, y: u32) -> u64 {
        self.counts[self.index(x, y)].load(Ordering::Relaxed)
    }

    /// Final pixel values, row-major. Splats are divided by spp.
    pub fn resolve(&self, spp: usize) -> Vec<Color> {
        let splat_scale = 1.0 / spp.max(1).to_float();
        self.pixels
            .iter()
            .zip(&self.counts)
            .zip(&self.splats)
            .map(|((pixel, count), splat)| {
                let count = count.load(Ordering::Relaxed);
                let mean = if count > 0 {
                    pixel.load() / count.to_float()
                } else {
                    Color::black()
                };
                mean + splat.load() * splat_scale
            })
            .collect()
    }

    pub fn to_rgb8(&self, spp: usize, tone_map: bool) -> RgbImage {
        let colors = self.resolve(spp);
        let mut img = RgbImage::new(self.width, self.height);
        for (i, c) in colors.iter().enumerate() {
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            img.put_pixel(x, y, Rgb(encode(*c, tone_map)));
        }
        img
    }

    pub fn save_png(&self, path: &Path, spp: usize, tone_map: bool) -> Result<()> {
        self.to_rgb8(spp, tone_map).save(path)?;
        Ok(())
    }
}

/// Reinhard tone mapping followed by gamma correction
fn encode(c: Color, tone_map: bool) -> [u8; 3] {
    let mapped = if tone_map {
        c.map(|v| v / (1.0 + v))
    } else {
        c
    };
    let mut out = [0; 3];
    for (i, o) in out.iter_mut().enumerate() {
        let v = mapped[i];
        let v = if v.is_finite() { clamp(v, 0.0, 1.0) } else { 0.0 };
        *o = (255.0 * v.powf(1.0 / 2.2) + 0.5) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_splats_are_not_lost() {
        let film = Arc::new(Film::new(4, 4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let film = film.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        film.add_splat_sample(Point2::new(1.5, 2.5), Color::gray(0.5));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let colors = film.resolve(1);
        assert_relative_eq!(colors[2 * 4 + 1].r(), 4000.0);
    }

    #[test]
    fn resolve_averages_samples_and_scales_splats() {
        let film = Film::new(2, 1);
        film.add_color_sample(0, 0, Color::gray(1.0));
        film.add_color_sample(0, 0, Color::gray(3.0));
        film.add_splat_sample(Point2::new(1.2, 0.7), Color::gray(8.0));
        film.add_splat_sample(Point2::new(-0.5, 0.0), Color::gray(8.0));
        film.add_splat_sample(Point2::new(2.0, 0.0), Color::gray(8.0));
        let colors = film.resolve(4);
        assert_relative_eq!(colors[0].g(), 2.0);
        assert_relative_eq!(colors[1].g(), 2.0);
        assert_eq!(film.sample_count(0, 0), 2);
        assert_eq!(film.sample_count(1, 0), 0);
    }

    #[test]
    fn encoding_clamps_and_discards_nan() {
        assert_eq!(encode(Color::new(0.0, 1.0, 5.0), false), [0, 255, 255]);
        assert_eq!(encode(Color::new(Float::NAN, 0.0, 0.0), true)[0], 0);
    }
}
