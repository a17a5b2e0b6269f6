//! Integrators estimating the radiance carried by camera rays

mod adaptive;
mod bdpt;
mod direct;
mod path_tracer;
mod vertex;
mod walk;

pub use self::adaptive::AdaptivePixel;
pub use self::bdpt::bdpt;
pub use self::direct::estimate_direct;
pub use self::path_tracer::path_trace;
pub use self::vertex::{PathVertex, VertexKind};
pub use self::walk::{random_walk, Walk};
