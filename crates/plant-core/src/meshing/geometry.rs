use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Point {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Small indexed mesh used as a template for leaves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    name: String,
    points: Vec<Point>,
    indices: Vec<u32>,
}

impl Geometry {
    /// Unit quad in the XZ plane, facing +Y, with its base on the origin.
    pub fn plane() -> Self {
        let mut geometry = Self {
            name: "plane".to_string(),
            ..Default::default()
        };
        geometry.push_quad(Vec3::X, Vec3::Y);
        geometry
    }

    /// Two unit quads crossing along the Z axis.
    pub fn perpendicular_planes() -> Self {
        let mut geometry = Self::plane();
        geometry.name = "perpendicular planes".to_string();
        geometry.push_quad(Vec3::Y, Vec3::X);
        geometry
    }

    /// Quad spanning `side` in [-0.5, 0.5] and z in [0, 1].
    fn push_quad(&mut self, side: Vec3, normal: Vec3) {
        let base = self.points.len() as u32;
        let corners = [
            (0.5, 0., Vec2::new(0., 1.)),
            (0.5, 1., Vec2::new(0., 0.)),
            (-0.5, 1., Vec2::new(1., 0.)),
            (-0.5, 0., Vec2::new(1., 1.)),
        ];
        for (s, z, uv) in corners {
            self.points
                .push(Point::new(s * side + z * Vec3::Z, normal, uv));
        }
        self.indices
            .extend([0, 1, 3, 1, 2, 3].into_iter().map(|i| base + i));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
    }

    /// Scale, then rotate, then translate every point.
    pub fn transform(&mut self, rotation: Quat, scale: Vec3, translation: Vec3) {
        for point in self.points.iter_mut() {
            point.position = rotation * (point.position * scale) + translation;
            point.normal = rotation * point.normal;
        }
    }

    /// Move the geometry so that the average of its points is the origin.
    pub fn to_center(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let average =
            self.points.iter().map(|p| p.position).sum::<Vec3>() / self.points.len() as f32;
        for point in self.points.iter_mut() {
            point.position -= average;
        }
    }
}
