use crate::float::*;
use crate::scene::Scene;

use super::super::vertex::PathVertex;

/// Densities of one vertex, overridden per strategy
#[derive(Clone, Copy, Debug)]
struct Density {
    fwd: Float,
    rev: Float,
    delta: bool,
}

impl Density {
    fn of(v: &PathVertex<'_>) -> Self {
        Self {
            fwd: v.pdf_fwd,
            rev: v.pdf_rev,
            delta: v.delta,
        }
    }
}

fn remap0(x: Float) -> Float {
    if x == 0.0 {
        1.0
    } else {
        x
    }
}

/// i:th vertex of a sub-path where the first vertex may have been
/// resampled for the connection
fn vertex_at<'p, 'a>(
    path: &'p [PathVertex<'a>],
    sampled: Option<&'p PathVertex<'a>>,
    i: usize,
) -> &'p PathVertex<'a> {
    match sampled {
        Some(v) if i == 0 => v,
        _ => &path[i],
    }
}

/// Weight of the (s, t) strategy among every strategy that could have
/// produced the same path. With mis the power heuristic is used,
/// otherwise every valid strategy gets the same weight.
/// sampled replaces the first light vertex when s == 1 and the camera
/// vertex when t == 1.
pub fn weight<'a>(
    scene: &Scene,
    light_path: &[PathVertex<'a>],
    camera_path: &[PathVertex<'a>],
    sampled: Option<&PathVertex<'a>>,
    s: usize,
    t: usize,
    mis: bool,
) -> Float {
    if s + t == 2 {
        return 1.0;
    }
    let light_sampled = if s == 1 { sampled } else { None };
    let camera_sampled = if t == 1 { sampled } else { None };
    let lv = |i| vertex_at(light_path, light_sampled, i);
    let cv = |i| vertex_at(camera_path, camera_sampled, i);

    let mut light: Vec<Density> = (0..s).map(|i| Density::of(lv(i))).collect();
    let mut camera: Vec<Density> = (0..t).map(|i| Density::of(cv(i))).collect();

    let pt = cv(t - 1);
    let pt_minus = if t > 1 { Some(cv(t - 2)) } else { None };
    let qs = if s > 0 { Some(lv(s - 1)) } else { None };
    let qs_minus = if s > 1 { Some(lv(s - 2)) } else { None };

    // The connection endpoints are never delta
    camera[t - 1].delta = false;
    if s > 0 {
        light[s - 1].delta = false;
    }
    // Reverse densities implied by this strategy
    camera[t - 1].rev = match qs {
        Some(qs) => qs.pdf(qs_minus, pt),
        None => pt.pdf_light_origin(scene),
    };
    if let Some(pt_minus) = pt_minus {
        camera[t - 2].rev = match qs {
            Some(qs) => pt.pdf(Some(qs), pt_minus),
            None => pt.pdf_light(pt_minus),
        };
    }
    if let Some(qs) = qs {
        light[s - 1].rev = pt.pdf(pt_minus, qs);
    }
    if let (Some(qs), Some(qs_minus)) = (qs, qs_minus) {
        light[s - 2].rev = qs.pdf(Some(pt), qs_minus);
    }

    let term = |ri: Float| if mis { ri } else { 1.0 };
    let mut sum_ri = 0.0;
    // Strategies with fewer camera vertices
    let mut ri = 1.0;
    for i in (1..t).rev() {
        ri *= sq(remap0(camera[i].rev) / remap0(camera[i].fwd));
        if !camera[i].delta && !camera[i - 1].delta {
            sum_ri += term(ri);
        }
    }
    // Strategies with fewer light vertices
    ri = 1.0;
    for i in (0..s).rev() {
        ri *= sq(remap0(light[i].rev) / remap0(light[i].fwd));
        let delta_light = if i > 0 {
            light[i - 1].delta
        } else {
            lv(0).is_delta_light()
        };
        if !light[i].delta && !delta_light {
            sum_ri += term(ri);
        }
    }
    1.0 / (1.0 + sum_ri)
}
