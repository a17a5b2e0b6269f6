use std::sync::{Arc, Barrier};

use approx::assert_relative_eq;
use cgmath::{Point3, Rad, Vector3};

use rusty_light_transport::bsdf::Bsdf;
use rusty_light_transport::camera::Camera;
use rusty_light_transport::color::Color;
use rusty_light_transport::film::Film;
use rusty_light_transport::float::*;
use rusty_light_transport::pt_renderer::{PTRenderer, RenderConfig, RussianRoulette};
use rusty_light_transport::scene::{Scene, SceneBuilder};
use rusty_light_transport::shape::Shape;
use rusty_light_transport::task::Task;
use rusty_light_transport::thread_pool::ThreadPool;
use rusty_light_transport::Error;

fn x(len: Float) -> Vector3<Float> {
    Vector3::new(len, 0.0, 0.0)
}

fn y(len: Float) -> Vector3<Float> {
    Vector3::new(0.0, len, 0.0)
}

fn z(len: Float) -> Vector3<Float> {
    Vector3::new(0.0, 0.0, len)
}

fn down_camera() -> Camera {
    Camera::look_at(
        Point3::new(0.0, 0.0, 1.5),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
        Rad(1.0),
        24,
        24,
    )
}

/// Emissive quad facing a large diffuse plane
fn quad_over_plane() -> Arc<Scene> {
    let mut builder = SceneBuilder::new();
    builder
        .add(
            Shape::quad(Point3::new(-5.0, -5.0, 0.0), x(10.0), y(10.0)),
            Bsdf::lambertian(Color::gray(0.5)),
        )
        .add_area_light(
            Shape::quad(Point3::new(-0.5, -0.5, 2.0), y(1.0), x(1.0)),
            Color::gray(5.0),
            None,
        );
    Arc::new(builder.build())
}

/// Closed diffuse box lit from the ceiling
fn closed_box() -> Arc<Scene> {
    let wall = Bsdf::lambertian(Color::gray(0.5));
    let mut builder = SceneBuilder::new();
    builder
        .add(Shape::quad(Point3::new(-1.0, -1.0, 0.0), x(2.0), y(2.0)), wall.clone())
        .add(Shape::quad(Point3::new(-1.0, -1.0, 2.0), y(2.0), x(2.0)), wall.clone())
        .add(Shape::quad(Point3::new(-1.0, -1.0, 0.0), y(2.0), z(2.0)), wall.clone())
        .add(Shape::quad(Point3::new(1.0, -1.0, 0.0), z(2.0), y(2.0)), wall.clone())
        .add(Shape::quad(Point3::new(-1.0, -1.0, 0.0), z(2.0), x(2.0)), wall.clone())
        .add(Shape::quad(Point3::new(-1.0, 1.0, 0.0), x(2.0), z(2.0)), wall)
        .add_area_light(
            Shape::quad(Point3::new(-0.3, -0.3, 1.99), y(0.6), x(0.6)),
            Color::gray(10.0),
            None,
        );
    Arc::new(builder.build())
}

/// Point light under a vertical mirror over a diffuse plane.
/// Light reaching the mirror reflects upward and escapes.
fn mirror_over_plane() -> Arc<Scene> {
    let mut builder = SceneBuilder::new();
    builder
        .add(
            Shape::quad(Point3::new(-5.0, -5.0, 0.0), x(10.0), y(10.0)),
            Bsdf::lambertian(Color::gray(0.5)),
        )
        // Facing -x toward the camera axis
        .add(
            Shape::quad(Point3::new(0.35, -1.0, 0.3), z(0.7), y(2.0)),
            Bsdf::mirror(Color::gray(0.9)),
        )
        .add_point_light(Point3::new(-0.2, 0.0, 0.25), Color::gray(0.5));
    Arc::new(builder.build())
}

/// Test sized version of a preset. Override fields on the result.
fn small(preset: RenderConfig) -> RenderConfig {
    RenderConfig {
        width: 24,
        height: 24,
        tile_size: 8,
        samples_per_dir: 6,
        max_threads: 4,
        ..preset
    }
}

fn mean_luma(film: &Film, spp: usize) -> Float {
    let pixels = film.resolve(spp);
    pixels.iter().map(Color::luma).sum::<Float>() / pixels.len().to_float()
}

fn render_mean(scene: &Arc<Scene>, config: &RenderConfig) -> Float {
    let renderer = PTRenderer::new(Arc::new(ThreadPool::new(config.max_threads)));
    let film = renderer
        .render(scene.clone(), &down_camera(), config)
        .unwrap();
    mean_luma(&film, config.samples_per_pixel())
}

#[test]
fn bdpt_matches_path_tracing() {
    let scene = quad_over_plane();
    let pt = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            russian_roulette: RussianRoulette::Off,
            ..small(RenderConfig::path_trace())
        },
    );
    let bdpt = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            ..small(RenderConfig::bdpt())
        },
    );
    let uniform = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            mis: false,
            ..small(RenderConfig::bdpt())
        },
    );
    assert!(pt > 0.0);
    assert_relative_eq!(bdpt, pt, max_relative = 0.04);
    assert_relative_eq!(uniform, pt, max_relative = 0.04);
}

#[test]
fn bdpt_matches_path_tracing_through_a_mirror() {
    let scene = mirror_over_plane();
    let pt = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            russian_roulette: RussianRoulette::Off,
            samples_per_dir: 8,
            ..small(RenderConfig::path_trace())
        },
    );
    let bdpt = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            samples_per_dir: 8,
            ..small(RenderConfig::bdpt())
        },
    );
    let uniform = render_mean(
        &scene,
        &RenderConfig {
            max_bounces: 4,
            mis: false,
            samples_per_dir: 8,
            ..small(RenderConfig::bdpt())
        },
    );
    assert!(pt > 0.0);
    assert_relative_eq!(bdpt, pt, max_relative = 0.04);
    assert_relative_eq!(uniform, pt, max_relative = 0.04);
}

#[test]
fn russian_roulette_keeps_the_mean() {
    let scene = closed_box();
    let base = RenderConfig {
        max_bounces: 6,
        pre_rr_bounces: 0,
        ..RenderConfig::path_trace()
    };
    let off = render_mean(
        &scene,
        &RenderConfig {
            russian_roulette: RussianRoulette::Off,
            ..small(base.clone())
        },
    );
    let dynamic = render_mean(
        &scene,
        &RenderConfig {
            russian_roulette: RussianRoulette::Dynamic,
            ..small(base.clone())
        },
    );
    let fixed = render_mean(
        &scene,
        &RenderConfig {
            russian_roulette: RussianRoulette::Static(0.7),
            ..small(base)
        },
    );
    assert_relative_eq!(dynamic, off, max_relative = 0.05);
    assert_relative_eq!(fixed, off, max_relative = 0.05);
}

#[test]
fn adaptive_renders_every_pixel() {
    let scene = quad_over_plane();
    let config = RenderConfig {
        samples_per_dir: 1,
        max_bounces: 4,
        ..small(RenderConfig::adaptive())
    };
    let renderer = PTRenderer::new(Arc::new(ThreadPool::new(2)));
    let film = renderer.render(scene, &down_camera(), &config).unwrap();
    for py in 0..config.height {
        for px in 0..config.width {
            assert_eq!(film.sample_count(px, py), 1);
        }
    }
    assert!(mean_luma(&film, 1) > 0.0);
}

#[test]
fn finished_render_covers_the_film() {
    let config = RenderConfig {
        samples_per_dir: 2,
        ..small(RenderConfig::path_trace())
    };
    let renderer = PTRenderer::new(Arc::new(ThreadPool::new(3)));
    let handle = renderer
        .start_render(closed_box(), &down_camera(), &config)
        .unwrap();
    let film = handle.wait().unwrap();
    assert!(handle.is_done());
    assert_eq!(handle.progress(), (9, 9));
    for py in 0..config.height {
        for px in 0..config.width {
            assert_eq!(film.sample_count(px, py), 4);
        }
    }
    let path = std::env::temp_dir().join(format!("render_test_{}.png", std::process::id()));
    handle.save_png(&path).unwrap();
    assert!(path.exists());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn path_tracing_ignores_thread_count() {
    let scene = closed_box();
    let config = RenderConfig {
        samples_per_dir: 2,
        max_bounces: 3,
        ..small(RenderConfig::path_trace())
    };
    let render = |threads| {
        let renderer = PTRenderer::new(Arc::new(ThreadPool::new(threads)));
        let film = renderer
            .render(scene.clone(), &down_camera(), &config)
            .unwrap();
        film.resolve(config.samples_per_pixel())
    };
    assert_eq!(render(1), render(4));
}

#[test]
fn aborted_render_leaves_the_film_empty() {
    let pool = Arc::new(ThreadPool::new(1));
    // Keep the only worker busy until the render has been aborted
    let gate = Arc::new(Barrier::new(2));
    let worker_gate = gate.clone();
    pool.enqueue(Task::new("gate", 1, move |_| {
        worker_gate.wait();
        Ok(())
    }));
    let renderer = PTRenderer::new(pool.clone());
    let config = small(RenderConfig::path_trace());
    let handle = renderer
        .start_render(closed_box(), &down_camera(), &config)
        .unwrap();
    handle.abort();
    let film = handle.wait().unwrap();
    gate.wait();
    for py in 0..config.height {
        for px in 0..config.width {
            assert_eq!(film.sample_count(px, py), 0);
        }
    }
}

#[test]
fn invalid_config_is_rejected() {
    let renderer = PTRenderer::new(Arc::new(ThreadPool::new(1)));
    let config = RenderConfig {
        samples_per_dir: 0,
        ..RenderConfig::path_trace()
    };
    match renderer.start_render(closed_box(), &down_camera(), &config) {
        Err(Error::InvalidConfig(_)) => (),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("render started with zero samples"),
    }
}
