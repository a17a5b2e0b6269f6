use cgmath::Point2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::float::*;
use crate::sample;

/// Source of sample values for one pixel at a time.
/// Every render block owns its own sampler.
pub trait Sampler: Send + Sync {
    /// Reset the stream for a new pixel
    fn start_pixel(&mut self, pixel: Point2<u32>);

    /// Begin the index:th sample of the current pixel
    fn start_sample(&mut self, index: usize);

    fn next_1d(&mut self) -> Float;

    fn next_2d(&mut self) -> Point2<Float>;

    fn samples_per_pixel(&self) -> usize;

    /// Fresh sampler of the same kind with its own seed
    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler>;
}

/// Mix the render seed with the pixel coordinates
fn pixel_seed(seed: u64, pixel: Point2<u32>) -> u64 {
    let mut z = seed ^ ((u64::from(pixel.y) << 32) | u64::from(pixel.x));
    // splitmix64 finalizer
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn uniform(rng: &mut Xoshiro256Plus) -> Float {
    rng.gen::<Float>().min(sample::ONE_MINUS_EPSILON)
}

/// Independent uniform samples
pub struct RandomSampler {
    seed: u64,
    samples_per_pixel: usize,
    rng: Xoshiro256Plus,
}

impl RandomSampler {
    pub fn new(samples_per_pixel: usize, seed: u64) -> Self {
        Self {
            seed,
            samples_per_pixel,
            rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn start_pixel(&mut self, pixel: Point2<u32>) {
        self.rng = Xoshiro256Plus::seed_from_u64(pixel_seed(self.seed, pixel));
    }

    fn start_sample(&mut self, _index: usize) {}

    fn next_1d(&mut self) -> Float {
        uniform(&mut self.rng)
    }

    fn next_2d(&mut self) -> Point2<Float> {
        Point2::new(uniform(&mut self.rng), uniform(&mut self.rng))
    }

    fn samples_per_pixel(&self) -> usize {
        self.samples_per_pixel
    }

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new(self.samples_per_pixel, seed))
    }
}

/// Jitters the first 2D dimension of every sample over a
/// samples_per_dir x samples_per_dir grid covering the pixel.
/// The remaining dimensions are independent.
pub struct StratifiedSampler {
    seed: u64,
    samples_per_dir: usize,
    rng: Xoshiro256Plus,
    grid: Vec<Point2<Float>>,
    index: usize,
    first_2d: bool,
}

impl StratifiedSampler {
    pub fn new(samples_per_dir: usize, seed: u64) -> Self {
        Self {
            seed,
            samples_per_dir,
            rng: Xoshiro256Plus::seed_from_u64(seed),
            grid: Vec::new(),
            index: 0,
            first_2d: true,
        }
    }
}

impl Sampler for StratifiedSampler {
    fn start_pixel(&mut self, pixel: Point2<u32>) {
        self.rng = Xoshiro256Plus::seed_from_u64(pixel_seed(self.seed, pixel));
        let rng = &mut self.rng;
        self.grid = sample::jittered_2d(self.samples_per_dir, self.samples_per_dir, &mut || {
            uniform(rng)
        });
        self.index = 0;
        self.first_2d = true;
    }

    fn start_sample(&mut self, index: usize) {
        self.index = index;
        self.first_2d = true;
    }

    fn next_1d(&mut self) -> Float {
        uniform(&mut self.rng)
    }

    fn next_2d(&mut self) -> Point2<Float> {
        if self.first_2d && !self.grid.is_empty() {
            self.first_2d = false;
            return self.grid[self.index % self.grid.len()];
        }
        Point2::new(uniform(&mut self.rng), uniform(&mut self.rng))
    }

    fn samples_per_pixel(&self) -> usize {
        self.samples_per_dir * self.samples_per_dir
    }

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new(self.samples_per_dir, seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_streams_are_reproducible() {
        let mut a = RandomSampler::new(4, 7);
        let mut b = a.clone_with_seed(7);
        a.start_pixel(Point2::new(3, 9));
        b.start_pixel(Point2::new(3, 9));
        for _ in 0..16 {
            assert_eq!(a.next_1d(), b.next_1d());
        }
        b.start_pixel(Point2::new(9, 3));
        a.start_pixel(Point2::new(3, 9));
        assert_ne!(a.next_2d(), b.next_2d());
    }

    #[test]
    fn stratified_clone_keeps_the_grid() {
        let mut a = StratifiedSampler::new(3, 5);
        let mut b = a.clone_with_seed(5);
        assert_eq!(b.samples_per_pixel(), 9);
        a.start_pixel(Point2::new(2, 1));
        b.start_pixel(Point2::new(2, 1));
        for i in 0..9 {
            a.start_sample(i);
            b.start_sample(i);
            assert_eq!(a.next_2d(), b.next_2d());
            assert_eq!(a.next_1d(), b.next_1d());
        }
    }

    #[test]
    fn first_dimension_covers_every_stratum() {
        let n = 4;
        let mut sampler = StratifiedSampler::new(n, 1);
        sampler.start_pixel(Point2::new(0, 0));
        let mut hit = vec![false; n * n];
        for i in 0..n * n {
            sampler.start_sample(i);
            let p = sampler.next_2d();
            let cell = (p.y * n.to_float()) as usize * n + (p.x * n.to_float()) as usize;
            hit[cell] = true;
            // Later dimensions are plain uniform values
            let q = sampler.next_2d();
            assert!(q.x < 1.0 && q.y < 1.0);
        }
        assert!(hit.iter().all(|&h| h));
    }
}
