//! Offline physically based light transport.
//!
//! Scenes are built with [`scene::SceneBuilder`] and rendered through
//! [`pt_renderer::PTRenderer`], which splits the image into tiles and runs
//! one of the integrators in [`pt_renderer::tracers`] on a shared
//! [`thread_pool::ThreadPool`].

pub mod bsdf;
pub mod camera;
pub mod color;
pub mod config;
pub mod consts;
pub mod error;
pub mod film;
pub mod float;
pub mod intersect;
pub mod light;
pub mod pt_renderer;
pub mod sample;
pub mod sampler;
pub mod scene;
pub mod shape;
pub mod stats;
pub mod task;
pub mod thread_pool;
pub mod util;

pub use crate::error::{Error, Result, TaskError};
pub use crate::float::Float;
