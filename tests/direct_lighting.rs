use approx::assert_relative_eq;
use cgmath::{Point2, Point3, Vector3};

use rusty_light_transport::bsdf::Bsdf;
use rusty_light_transport::color::Color;
use rusty_light_transport::float::*;
use rusty_light_transport::intersect::Interaction;
use rusty_light_transport::pt_renderer::tracers::estimate_direct;
use rusty_light_transport::sampler::{RandomSampler, Sampler};
use rusty_light_transport::scene::SceneBuilder;
use rusty_light_transport::shape::Shape;

/// Mean of n direct lighting estimates at the origin of a plane facing +z
fn mean_direct(builder: &mut SceneBuilder, albedo: Float, n: usize) -> Color {
    let scene = builder.build();
    let bsdf = Bsdf::lambertian(Color::gray(albedo));
    let isect = Interaction::new(
        Point3::new(0.0, 0.0, 0.0),
        1.0,
        Vector3::unit_z(),
        Vector3::unit_z(),
        Some(&bsdf),
        None,
    );
    let mut sampler = RandomSampler::new(1, 17);
    sampler.start_pixel(Point2::new(0, 0));
    let sum: Color = (0..n)
        .map(|_| estimate_direct(&scene, &isect, Vector3::unit_z(), &mut sampler))
        .sum();
    sum / n.to_float()
}

#[test]
fn sphere_light_on_axis_matches_solid_angle_formula() {
    let (radius, height, le, albedo) = (0.5, 2.0, 3.0, 0.6);
    let mut builder = SceneBuilder::new();
    builder.add_area_light(
        Shape::sphere(Point3::new(0.0, 0.0, height), radius),
        Color::gray(le),
        None,
    );
    let l = mean_direct(&mut builder, albedo, 20_000);
    // Irradiance of a uniform sphere on its axis is pi * Le * r^2 / h^2
    let expected = albedo * le * radius * radius / (height * height);
    assert_relative_eq!(l.g(), expected, max_relative = 0.01);
}

#[test]
fn two_lights_add_up() {
    let mut builder = SceneBuilder::new();
    builder
        .add_area_light(
            Shape::sphere(Point3::new(0.0, 0.0, 2.0), 0.5),
            Color::gray(3.0),
            None,
        )
        .add_point_light(Point3::new(0.0, 0.0, 4.0), Color::gray(8.0));
    let l = mean_direct(&mut builder, 0.6, 200_000);
    // The sphere shadows the point light
    let expected = 0.6 * 3.0 * 0.25 / 4.0;
    assert_relative_eq!(l.g(), expected, max_relative = 0.02);
}
