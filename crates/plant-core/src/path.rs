use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spline::{Spline, SplineIndex};

/// Result of sampling a path at an arbitrary distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Intermediate {
    Point(Vec3),
    /// the distance is negative or past the end of the path
    OutOfRange,
    /// the path has fewer than two evaluated points
    Empty,
}

impl Intermediate {
    pub fn point(self) -> Option<Vec3> {
        match self {
            Intermediate::Point(p) => Some(p),
            _ => None,
        }
    }
}

/// Centerline of a stem plus its radius profile.
///
/// Points are relative to the location of the owning stem. The evaluated
/// points are regenerated by every setter that changes the control spline,
/// the resolution or the subdivision level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Path {
    spline: Spline,
    resolution: usize,
    subdivisions: usize,
    initial_divisions: usize,
    linear_start: bool,
    radius: Spline,
    min_radius: f32,
    max_radius: f32,
    points: Vec<Vec3>,
}

impl Default for Path {
    fn default() -> Self {
        Self {
            spline: Spline::default(),
            resolution: 2,
            subdivisions: 0,
            initial_divisions: 0,
            linear_start: false,
            radius: Spline::default_profile(),
            min_radius: 0.015,
            max_radius: 0.2,
            points: Vec::new(),
        }
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.spline == other.spline
            && self.resolution == other.resolution
            && self.subdivisions == other.subdivisions
            && self.initial_divisions == other.initial_divisions
            && self.radius == other.radius
            && self.min_radius == other.min_radius
            && self.max_radius == other.max_radius
    }
}

impl Path {
    pub fn new(spline: Spline) -> Self {
        let mut path = Self {
            spline,
            ..Default::default()
        };
        path.generate(false);
        path
    }

    /// Straight path from the origin to `end`.
    pub fn straight(end: Vec3, degree: u32) -> Self {
        let mut spline = Spline::new(degree);
        spline.push_curve(Vec3::ZERO);
        spline.push_curve(end);
        Self::new(spline)
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn set_spline(&mut self, spline: Spline) {
        self.spline = spline;
        self.regenerate();
    }

    /// Append a straight curve ending at `end`.
    pub fn extend_to(&mut self, end: Vec3) {
        self.spline.push_curve(end);
        self.regenerate();
    }

    /// Set the divisions of each curve. Values below 2 are raised to 2.
    pub fn set_resolution(&mut self, resolution: usize) {
        self.resolution = resolution.max(2);
        self.regenerate();
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Each level doubles the divisions of every curve.
    pub fn subdivide(&mut self, level: usize) {
        self.subdivisions = level;
        self.regenerate();
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    /// Divisions of the first curve; 0 falls back to the regular divisions.
    pub fn set_initial_divisions(&mut self, divisions: usize) {
        self.initial_divisions = divisions;
        self.regenerate();
    }

    pub fn initial_divisions(&self) -> usize {
        self.initial_divisions
    }

    pub fn is_linear_start(&self) -> bool {
        self.linear_start
    }

    fn divisions(&self) -> usize {
        self.resolution << self.subdivisions
    }

    fn first_divisions(&self) -> usize {
        if self.initial_divisions > 0 {
            self.initial_divisions
        } else {
            self.divisions()
        }
    }

    fn regenerate(&mut self) {
        self.generate(self.linear_start)
    }

    /// Evaluate points along the spline. The first curve is a straight line
    /// between its end points if `linear_start` is set.
    pub fn generate(&mut self, linear_start: bool) {
        self.linear_start = linear_start;
        self.points.clear();

        let curves = self.spline.curve_count();
        if curves == 0 {
            self.points.extend(self.spline.controls().first());
            return;
        }

        for c in 0..curves {
            let divisions = if c == 0 {
                self.first_divisions()
            } else {
                self.divisions()
            };
            for k in 0..divisions {
                let t = k as f32 / divisions as f32;
                let point = match self.spline.curve(c) {
                    Some(curve) if c == 0 && linear_start => {
                        Some(curve[0].lerp(curve[curve.len() - 1], t))
                    }
                    _ => self.spline.evaluate(SplineIndex::Local(c, t)),
                };
                self.points.extend(point);
            }
        }
        let last = self.spline.curve(curves - 1).map(|curve| curve[curve.len() - 1]);
        self.points.extend(last);
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }

    /// Distance between the point at `index` and the next one.
    pub fn segment_length(&self, index: usize) -> f32 {
        match (self.get(index), self.get(index + 1)) {
            (Some(a), Some(b)) => (b - a).length(),
            _ => 0.,
        }
    }

    /// Distance along the path from the first point to the point at `index`.
    pub fn distance_to(&self, index: usize) -> f32 {
        let end = usize::min(index, self.len().saturating_sub(1));
        (0..end).map(|i| self.segment_length(i)).sum()
    }

    pub fn distance_between(&self, start: usize, end: usize) -> f32 {
        self.distance_to(end) - self.distance_to(start)
    }

    /// Index of the point that starts the segment containing `distance`.
    pub fn index_at(&self, distance: f32) -> Option<usize> {
        if self.len() < 2 || !(0. ..=self.length()).contains(&distance) {
            return None;
        }
        let mut acc = 0.;
        for i in 0..self.len() - 1 {
            acc += self.segment_length(i);
            if distance < acc {
                return Some(i);
            }
        }
        Some(self.len() - 2)
    }

    /// Position at `distance` along the path, relative to the stem location.
    pub fn intermediate(&self, distance: f32) -> Intermediate {
        if self.len() < 2 {
            return Intermediate::Empty;
        }
        let length = self.length();
        if !(0. ..=length).contains(&distance) {
            return Intermediate::OutOfRange;
        }
        if distance == length {
            return Intermediate::Point(self.points[self.len() - 1]);
        }

        let mut acc = 0.;
        for w in self.points.windows(2) {
            let segment = (w[1] - w[0]).length();
            if distance <= acc + segment {
                let t = if segment > 0. {
                    (distance - acc) / segment
                } else {
                    0.
                };
                return Intermediate::Point(w[0].lerp(w[1], t));
            }
            acc += segment;
        }
        Intermediate::Point(self.points[self.len() - 1])
    }

    /// Normalized direction of the segment starting at `index`. The last
    /// point reuses the direction of the segment leading to it.
    pub fn direction(&self, index: usize) -> Vec3 {
        let n = self.len();
        if n < 2 {
            return Vec3::ZERO;
        }
        let i = usize::min(index, n - 2);
        (self.points[i + 1] - self.points[i]).normalize_or_zero()
    }

    /// Blend of the incoming and outgoing directions at an interior point.
    pub fn average_direction(&self, index: usize) -> Vec3 {
        if index == 0 || index + 1 >= self.len() {
            return self.direction(index);
        }
        let blend = self.direction(index - 1) + self.direction(index);
        match blend.try_normalize() {
            Some(d) => d,
            None => self.direction(index),
        }
    }

    pub fn intermediate_direction(&self, distance: f32) -> Vec3 {
        match self.index_at(distance) {
            Some(i) => self.direction(i),
            None => Vec3::ZERO,
        }
    }

    /// Map a control point of the spline to the index of the evaluated point
    /// generated for it. Handles map proportionally inside their curve.
    pub fn to_path_index(&self, control: usize) -> usize {
        let d = self.spline.degree() as usize;
        let curve = control / d;
        let rem = control % d;
        let first = self.first_divisions();
        let divisions = self.divisions();
        let index = if curve == 0 {
            (rem * first + d / 2) / d
        } else {
            first + (curve - 1) * divisions + (rem * divisions + d / 2) / d
        };
        usize::min(index, self.len().saturating_sub(1))
    }

    pub fn set_min_radius(&mut self, radius: f32) -> Result<()> {
        if radius < 0. {
            return Err(Error::NegativeRadius(radius));
        }
        self.min_radius = radius;
        Ok(())
    }

    pub fn min_radius(&self) -> f32 {
        self.min_radius
    }

    pub fn set_max_radius(&mut self, radius: f32) -> Result<()> {
        if radius < 0. {
            return Err(Error::NegativeRadius(radius));
        }
        self.max_radius = radius;
        Ok(())
    }

    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    pub fn set_radius(&mut self, profile: Spline) {
        self.radius = profile;
    }

    pub fn radius_profile(&self) -> &Spline {
        &self.radius
    }

    /// Radius at `t` in [0, 1] along the path, always between the min and
    /// max clamps.
    pub fn intermediate_radius(&self, t: f32) -> f32 {
        let profile = self
            .radius
            .sample_y(t.clamp(0., 1.))
            .unwrap_or(1.)
            .clamp(0., 1.);
        (self.min_radius + (self.max_radius - self.min_radius) * profile).max(0.)
    }

    pub fn radius_at(&self, index: usize) -> f32 {
        let length = self.length();
        let t = if length > 0. {
            self.distance_to(index) / length
        } else {
            0.
        };
        self.intermediate_radius(t)
    }
}
