use crate::error::{Error, Result};
use crate::float::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderMode {
    /// Standard path tracing
    PathTracing,
    /// Path tracing with recursive refinement of the pixel footprint
    AdaptivePathTracing,
    /// Bidirectional path tracing
    Bdpt,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RussianRoulette {
    /// Select survival probability based on path throughput
    Dynamic,
    /// Constant survival probability
    Static(Float),
    /// No russian roulette
    Off,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Width of the render target in pixels
    pub width: u32,
    /// Height of the render target in pixels
    pub height: u32,
    /// Side length of the square tiles handed to workers
    pub tile_size: u32,
    /// Maximum number of threads to use for rendering
    pub max_threads: usize,
    /// Integrator used for the image
    pub render_mode: RenderMode,
    /// Type of russian roulette. Only the path tracers use it.
    pub russian_roulette: RussianRoulette,
    /// Weight bidirectional strategies with MIS instead of uniformly
    pub mis: bool,
    /// Number of bounces before starting russian roulette.
    /// Won't have effect is russian roulette is off.
    pub pre_rr_bounces: usize,
    /// Maximum number of bounces allowed before path is terminated.
    // std::usize::MAX should suffice for "unlimited" bounces
    pub max_bounces: usize,
    /// Samples per pixel per direction. Squared to get the total samples per pixel.
    pub samples_per_dir: usize,
    /// Seed of the per pixel sample streams
    pub seed: u64,
    /// Largest channel difference between corner samples that stops refinement
    pub adaptive_tolerance: Float,
    /// Finest subdivision of a pixel side. Must be a power of two.
    pub adaptive_grid: usize,
    /// Should tone mapping be used
    pub tone_map: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::path_trace()
    }
}

impl RenderConfig {
    pub fn path_trace() -> Self {
        Self {
            width: 400,
            height: 400,
            tile_size: 16,
            max_threads: num_cpus::get(),
            render_mode: RenderMode::PathTracing,
            russian_roulette: RussianRoulette::Dynamic,
            mis: true,
            pre_rr_bounces: 5,
            max_bounces: std::usize::MAX,
            samples_per_dir: 4,
            seed: 0,
            adaptive_tolerance: 0.05,
            adaptive_grid: 8,
            tone_map: true,
        }
    }

    pub fn bdpt() -> Self {
        Self {
            render_mode: RenderMode::Bdpt,
            russian_roulette: RussianRoulette::Off,
            max_bounces: 8,
            samples_per_dir: 3,
            ..Self::path_trace()
        }
    }

    pub fn adaptive() -> Self {
        Self {
            render_mode: RenderMode::AdaptivePathTracing,
            samples_per_dir: 1,
            ..Self::path_trace()
        }
    }

    pub fn benchmark() -> Self {
        Self {
            width: 300,
            height: 300,
            max_threads: 8,
            russian_roulette: RussianRoulette::Off,
            max_bounces: 5,
            samples_per_dir: 3,
            seed: 1,
            ..Self::path_trace()
        }
    }

    pub fn high_quality() -> Self {
        Self {
            width: 800,
            height: 800,
            samples_per_dir: 16,
            max_bounces: 16,
            ..Self::bdpt()
        }
    }

    pub fn single_threaded(self) -> Self {
        tracing::info!("running single threaded");
        Self {
            max_threads: 1,
            ..self
        }
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.samples_per_dir * self.samples_per_dir
    }

    /// Reject configurations the renderer can't run
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.width == 0 || self.height == 0 {
            return invalid("image dimensions must be positive");
        }
        if self.tile_size == 0 {
            return invalid("tile size must be positive");
        }
        if self.samples_per_dir == 0 {
            return invalid("samples per direction must be positive");
        }
        if self.max_threads == 0 {
            return invalid("at least one thread is required");
        }
        if let RussianRoulette::Static(prob) = self.russian_roulette {
            if !(prob > 0.0 && prob <= 1.0) {
                return invalid("static russian roulette probability must be in (0, 1]");
            }
        }
        let unbounded = self.max_bounces == std::usize::MAX;
        if unbounded
            && (self.render_mode == RenderMode::Bdpt
                || self.russian_roulette == RussianRoulette::Off)
        {
            return invalid("paths without russian roulette need a finite max_bounces");
        }
        if self.render_mode == RenderMode::AdaptivePathTracing {
            if !(self.adaptive_tolerance > 0.0) {
                return invalid("adaptive tolerance must be positive");
            }
            if !self.adaptive_grid.is_power_of_two() {
                return invalid("adaptive grid must be a power of two");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for config in &[
            RenderConfig::path_trace(),
            RenderConfig::bdpt(),
            RenderConfig::adaptive(),
            RenderConfig::benchmark(),
            RenderConfig::high_quality(),
            RenderConfig::bdpt().single_threaded(),
        ] {
            assert!(config.validate().is_ok(), "{:?}", config);
        }
    }

    #[test]
    fn bad_values_are_rejected() {
        let bad = vec![
            RenderConfig {
                width: 0,
                ..RenderConfig::default()
            },
            RenderConfig {
                tile_size: 0,
                ..RenderConfig::default()
            },
            RenderConfig {
                samples_per_dir: 0,
                ..RenderConfig::default()
            },
            RenderConfig {
                max_threads: 0,
                ..RenderConfig::default()
            },
            RenderConfig {
                russian_roulette: RussianRoulette::Static(0.0),
                ..RenderConfig::default()
            },
            RenderConfig {
                russian_roulette: RussianRoulette::Static(1.5),
                ..RenderConfig::default()
            },
            RenderConfig {
                max_bounces: std::usize::MAX,
                ..RenderConfig::bdpt()
            },
            RenderConfig {
                adaptive_tolerance: 0.0,
                ..RenderConfig::adaptive()
            },
            RenderConfig {
                adaptive_grid: 6,
                ..RenderConfig::adaptive()
            },
        ];
        for config in bad {
            match config.validate() {
                Err(Error::InvalidConfig(_)) => (),
                other => panic!("{:?} accepted: {:?}", config, other),
            }
        }
    }
}
