use glam::{Quat, Vec2, Vec3};
use std::f32::consts::TAU;

use super::geometry::Point;

/// Orientation of each cross section along a polyline.
///
/// The first frame maps +Y onto the first direction, the next ones are
/// transported from their predecessor so that consecutive rings do not twist.
pub fn ring_frames(directions: impl IntoIterator<Item = Vec3>) -> Vec<Quat> {
    let mut result = Vec::new();
    let mut previous: Option<(Vec3, Quat)> = None;
    for direction in directions {
        let direction = direction.try_normalize().unwrap_or(Vec3::Y);
        let frame = match previous {
            None => Quat::from_rotation_arc(Vec3::Y, direction),
            Some((d, q)) => (Quat::from_rotation_arc(d, direction) * q).normalize(),
        };
        result.push(frame);
        previous = Some((direction, frame));
    }
    result
}

/// Circle of `divisions + 1` points around `center`, in the plane
/// orthogonal to `frame * Y`. The first point is repeated at the end so the
/// texture seam gets its own vertices.
pub fn ring(center: Vec3, frame: Quat, radius: f32, divisions: usize, v: f32) -> Vec<Point> {
    (0..=divisions)
        .map(|j| {
            let u = j as f32 / divisions as f32;
            let (sin, cos) = f32::sin_cos(u * TAU);
            let normal = frame * Vec3::new(cos, 0., sin);
            Point::new(center + radius * normal, normal, Vec2::new(u, v))
        })
        .collect()
}

// c2 is above c1, both contours turn the same way
pub fn mesh_between_contours(
    position: impl Fn(u32) -> Vec3,
    c1: &[u32],
    c2: &[u32],
    close_contour: bool,
) -> Vec<u32> {
    let mut result = Vec::new();
    if c1.is_empty() || c2.is_empty() {
        return result;
    }
    let mut f1_idx = 0;
    let mut f2_idx = 0;

    while f1_idx < c1.len() - 1 || f2_idx < c2.len() - 1 {
        let advance_first = if f2_idx == c2.len() - 1 {
            true
        } else if f1_idx == c1.len() - 1 {
            false
        } else {
            let d1 = position(c2[f2_idx]).distance(position(c1[f1_idx + 1]));
            let d2 = position(c1[f1_idx]).distance(position(c2[f2_idx + 1]));
            d1 < d2
        };
        if advance_first {
            result.extend([c2[f2_idx], c1[f1_idx], c1[f1_idx + 1]]);
            f1_idx += 1;
        } else {
            result.extend([c2[f2_idx], c1[f1_idx], c2[f2_idx + 1]]);
            f2_idx += 1;
        }
    }

    if close_contour {
        result.extend([c2[f2_idx], c1[f1_idx], c1[0]]);
        result.extend([c2[f2_idx], c1[0], c2[0]]);
    }

    result
}
