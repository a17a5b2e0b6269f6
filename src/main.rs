use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cgmath::{Point3, Rad, Vector3};
use chrono::Local;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rusty_light_transport::bsdf::Bsdf;
use rusty_light_transport::camera::Camera;
use rusty_light_transport::color::Color;
use rusty_light_transport::pt_renderer::{PTRenderer, RenderConfig};
use rusty_light_transport::scene::{Scene, SceneBuilder};
use rusty_light_transport::shape::Shape;
use rusty_light_transport::stats;
use rusty_light_transport::thread_pool::ThreadPool;

/// Two unit wide box with a small ceiling light, a mirror ball and a glass ball
fn cornell_box() -> (Scene, Camera) {
    let white = Bsdf::lambertian(Color::gray(0.73));
    let red = Bsdf::lambertian(Color::new(0.63, 0.065, 0.05));
    let green = Bsdf::lambertian(Color::new(0.14, 0.45, 0.091));
    let x = Vector3::new(2.0, 0.0, 0.0);
    let y = Vector3::new(0.0, 2.0, 0.0);
    let z = Vector3::new(0.0, 0.0, 2.0);
    let mut builder = SceneBuilder::new();
    builder
        // Floor, ceiling and back wall
        .add(Shape::quad(Point3::new(-1.0, 0.0, -1.0), z, x), white.clone())
        .add(Shape::quad(Point3::new(-1.0, 2.0, -1.0), x, z), white.clone())
        .add(Shape::quad(Point3::new(-1.0, 0.0, -1.0), x, y), white)
        .add(Shape::quad(Point3::new(-1.0, 0.0, -1.0), y, z), red)
        .add(Shape::quad(Point3::new(1.0, 0.0, -1.0), z, y), green)
        .add(
            Shape::sphere(Point3::new(-0.45, 0.35, -0.3), 0.35),
            Bsdf::mirror(Color::gray(0.95)),
        )
        .add(
            Shape::sphere(Point3::new(0.45, 0.35, 0.3), 0.35),
            Bsdf::smooth_dielectric(Color::white(), Color::white(), 1.5),
        )
        .add_area_light(
            Shape::quad(
                Point3::new(-0.25, 1.98, -0.25),
                Vector3::new(0.5, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.5),
            ),
            Color::gray(12.0),
            None,
        );
    let camera = Camera::look_at(
        Point3::new(0.0, 1.0, 3.5),
        Point3::new(0.0, 1.0, 0.0),
        Vector3::unit_y(),
        Rad(0.7),
        400,
        400,
    );
    (builder.build(), camera)
}

fn config_for(mode: &str) -> Result<RenderConfig> {
    let config = match mode {
        "pt" => RenderConfig::path_trace(),
        "adaptive" => RenderConfig::adaptive(),
        "bdpt" => RenderConfig::bdpt(),
        "benchmark" => RenderConfig::benchmark(),
        "hq" => RenderConfig::high_quality(),
        other => bail!(
            "unknown mode '{}', expected pt, adaptive, bdpt, benchmark or hq",
            other
        ),
    };
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "pt".to_string());
    let mut config = config_for(&mode)?;
    if args.any(|arg| arg == "--single-threaded") {
        config = config.single_threaded();
    }

    let root_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let save_path = root_path.join("results");
    std::fs::create_dir_all(&save_path)
        .with_context(|| format!("failed to create {}", save_path.display()))?;

    stats::new_scene(&format!("cornell-{}", mode));
    let (scene, camera) = {
        let _t = stats::time("Load");
        cornell_box()
    };
    let renderer = PTRenderer::new(Arc::new(ThreadPool::new(config.max_threads)));
    let handle = renderer.start_render(Arc::new(scene), &camera, &config)?;
    handle.yield_until_done()?;

    let stamp = Local::now().format("%F_%H%M%S").to_string();
    let image_path = save_path.join(format!("cornell_{}_{}.png", mode, stamp));
    handle.save_png(&image_path)?;
    info!(path = %image_path.display(), "saved image");
    stats::print_and_save(&save_path.join(format!("stats_{}.txt", stamp)))?;
    Ok(())
}
