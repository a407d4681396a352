use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::plant::Plant;
use crate::stem::StemId;
use crate::utils::FloatProducer;

/// Light received by one stem during a cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// average direction towards the light sources that reached the stem
    pub direction: Vec3,
    pub rays: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box around every well placed stem, radii included.
    pub fn of_plant(plant: &Plant) -> Option<Self> {
        let mut result: Option<Self> = None;
        for (_, stem) in plant.stems() {
            let Some(location) = stem.location() else {
                continue;
            };
            let margin = Vec3::splat(stem.max_radius());
            for &p in stem.path().points() {
                let p = location + p;
                result = Some(match result {
                    None => Self {
                        min: p - margin,
                        max: p + margin,
                    },
                    Some(b) => Self {
                        min: b.min.min(p - margin),
                        max: b.max.max(p + margin),
                    },
                });
            }
        }
        result
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn radius(&self) -> f32 {
        0.5 * (self.max - self.min).length()
    }
}

/// Directions the light travels along: straight down, then `4 * l` azimuths
/// on each level `l` tilted further away from the zenith.
pub fn ray_directions(levels: u32) -> Vec<Vec3> {
    let mut result = vec![Vec3::NEG_Y];
    for l in 1..=levels {
        let polar = l as f32 / (levels + 1) as f32 * FRAC_PI_2;
        let count = 4 * l;
        for k in 0..count {
            let azimuth = k as f32 / count as f32 * TAU;
            let towards_light = Vec3::new(
                polar.sin() * azimuth.cos(),
                polar.cos(),
                polar.sin() * azimuth.sin(),
            );
            result.push(-towards_light);
        }
    }
    result
}

fn sphere_intersection(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = direction.dot(oc);
    let c = oc.dot(oc) - radius * radius;
    let h = b * b - c;
    if h < 0. {
        return None;
    }
    let t = -b - h.sqrt();
    (t >= 0.).then_some(t)
}

/// Distance along a normalized ray to the first hit with the capsule of
/// axis `a`-`b`. The capsule is the union of its body and two end spheres.
pub fn capsule_intersection(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let ba = b - a;
    let oa = origin - a;
    let baba = ba.dot(ba);
    let bard = ba.dot(direction);
    let baoa = ba.dot(oa);
    let rdoa = direction.dot(oa);
    let oaoa = oa.dot(oa);

    let k2 = baba - bard * bard;
    let body = if k2 > 1e-9 {
        let k1 = baba * rdoa - baoa * bard;
        let k0 = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = k1 * k1 - k2 * k0;
        if h >= 0. {
            let t = (-k1 - h.sqrt()) / k2;
            let y = baoa + t * bard;
            (t >= 0. && y > 0. && y < baba).then_some(t)
        } else {
            None
        }
    } else {
        None
    };

    [
        body,
        sphere_intersection(origin, direction, a, radius),
        sphere_intersection(origin, direction, b, radius),
    ]
    .into_iter()
    .flatten()
    .reduce(f32::min)
}

struct Capsule {
    stem: StemId,
    a: Vec3,
    b: Vec3,
    radius: f32,
}

fn capsules(plant: &Plant) -> Vec<Capsule> {
    let mut result = Vec::new();
    for (id, stem) in plant.stems() {
        let Some(location) = stem.location() else {
            continue;
        };
        let path = stem.path();
        for i in 0..path.len().saturating_sub(1) {
            if let (Some(a), Some(b)) = (path.get(i), path.get(i + 1)) {
                result.push(Capsule {
                    stem: id,
                    a: location + a,
                    b: location + b,
                    radius: f32::max(path.radius_at(i), path.radius_at(i + 1)),
                });
            }
        }
    }
    result
}

/// Cast a `ray_count x ray_count` grid of parallel rays along every light
/// direction and credit each ray to the first stem it hits.
pub fn cast_rays(plant: &Plant, ray_count: u32, ray_levels: u32) -> BTreeMap<StemId, Light> {
    let mut lights: BTreeMap<StemId, Light> = BTreeMap::new();
    let Some(bounds) = BoundingBox::of_plant(plant) else {
        return lights;
    };
    let capsules = capsules(plant);
    let center = bounds.center();
    let radius = bounds.radius().max(f32::EPSILON);
    let n = ray_count.max(1);

    for direction in ray_directions(ray_levels) {
        let u = direction.any_orthonormal_vector();
        let v = direction.cross(u);
        let start = center - 2. * radius * direction;
        for i in 0..n {
            for j in 0..n {
                let x = ((i as f32 + 0.5) / n as f32 * 2. - 1.) * radius;
                let y = ((j as f32 + 0.5) / n as f32 * 2. - 1.) * radius;
                let origin = start + x * u + y * v;

                let hits: Vec<(StemId, f32)> = capsules
                    .iter()
                    .filter_map(|c| {
                        capsule_intersection(origin, direction, c.a, c.b, c.radius)
                            .map(|t| (c.stem, t))
                    })
                    .collect();
                if let Some(closest) = hits.iter().map(|h| h.1).arg_min() {
                    let light = lights.entry(hits[closest].0).or_default();
                    light.direction -= direction;
                    light.rays += 1;
                }
            }
        }
    }

    for light in lights.values_mut() {
        light.direction = light.direction.normalize_or_zero();
    }
    lights
}
