use glam::{FloatExt, Vec3};
use serde::{Deserialize, Serialize};

/// Samples taken per curve when a spline is read as a function of x.
const FUNCTION_SAMPLES: usize = 16;

#[derive(Copy, Clone, Debug)]
pub enum SplineIndex {
    /// real number between 0 and 1, over the whole spline
    Global(f32),
    /// index of the curve to consider and real number between 0 and 1
    Local(usize, f32),
}

/// Piecewise Bezier curve of degree 1, 2 or 3.
///
/// Consecutive curves share their end points, so a spline of `n` curves has
/// `degree * n + 1` control points. Trailing controls that do not complete a
/// curve are kept but never evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    degree: u32,
    controls: Vec<Vec3>,
}

impl Default for Spline {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Spline {
    pub fn new(degree: u32) -> Self {
        Self {
            degree: degree.clamp(1, 3),
            controls: Vec::new(),
        }
    }

    pub fn from_controls(degree: u32, controls: Vec<Vec3>) -> Self {
        Self {
            degree: degree.clamp(1, 3),
            controls,
        }
    }

    pub fn linear(a: Vec3, b: Vec3) -> Self {
        Self::from_controls(1, vec![a, b])
    }

    /// Descending profile from 1 at x=0 to 0 at x=1.
    pub fn default_profile() -> Self {
        Self::linear(Vec3::new(0., 1., 0.), Vec3::new(1., 0., 0.))
    }

    /// Constant profile `y` over x in [0, 1].
    pub fn flat(y: f32) -> Self {
        Self::linear(Vec3::new(0., y, 0.), Vec3::new(1., y, 0.))
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn controls(&self) -> &[Vec3] {
        &self.controls
    }

    pub fn set_controls(&mut self, controls: Vec<Vec3>) {
        self.controls = controls;
    }

    pub fn curve_count(&self) -> usize {
        if self.controls.len() < 2 {
            0
        } else {
            (self.controls.len() - 1) / self.degree as usize
        }
    }

    pub fn curve(&self, index: usize) -> Option<&[Vec3]> {
        let d = self.degree as usize;
        if index >= self.curve_count() {
            return None;
        }
        Some(&self.controls[index * d..=index * d + d])
    }

    /// Append a curve from the current last control to `end`. The inner
    /// handles are placed on the chord so the new curve is straight.
    pub fn push_curve(&mut self, end: Vec3) {
        let Some(&start) = self.controls.last() else {
            self.controls.push(end);
            return;
        };
        for k in 1..self.degree {
            self.controls
                .push(start.lerp(end, k as f32 / self.degree as f32));
        }
        self.controls.push(end);
    }

    pub fn evaluate(&self, index: SplineIndex) -> Option<Vec3> {
        let n = self.curve_count();
        if n == 0 {
            return self.controls.first().copied();
        }
        let (curve, t) = match index {
            SplineIndex::Global(t) => {
                let scaled = t.clamp(0., 1.) * n as f32;
                let i = usize::min(scaled as usize, n - 1);
                (i, scaled - i as f32)
            }
            SplineIndex::Local(i, t) => (usize::min(i, n - 1), t.clamp(0., 1.)),
        };
        self.curve(curve).map(|p| bernstein(p, t))
    }

    /// Read a 2-D curve whose x grows monotonically as the function y(x).
    /// Outside the sampled domain the nearest end value is returned.
    pub fn sample_y(&self, x: f32) -> Option<f32> {
        let n = self.curve_count();
        if n == 0 {
            return self.controls.first().map(|p| p.y);
        }
        let samples: Vec<Vec3> = (0..n)
            .flat_map(|c| {
                (0..FUNCTION_SAMPLES).map(move |k| (c, k as f32 / FUNCTION_SAMPLES as f32))
            })
            .filter_map(|(c, t)| self.evaluate(SplineIndex::Local(c, t)))
            .chain(self.controls.get(n * self.degree as usize).copied())
            .collect();

        let first = samples[0];
        let last = samples[samples.len() - 1];
        if x <= first.x {
            return Some(first.y);
        }
        if x >= last.x {
            return Some(last.y);
        }
        samples
            .windows(2)
            .find(|w| w[0].x <= x && x <= w[1].x)
            .map(|w| {
                let span = w[1].x - w[0].x;
                if span <= f32::EPSILON {
                    w[0].y
                } else {
                    w[0].y.lerp(w[1].y, (x - w[0].x) / span)
                }
            })
            .or(Some(last.y))
    }
}

fn bernstein(p: &[Vec3], t: f32) -> Vec3 {
    let s = 1. - t;
    match p.len() {
        2 => p[0].lerp(p[1], t),
        3 => s * s * p[0] + 2. * s * t * p[1] + t * t * p[2],
        _ => s * s * s * p[0] + 3. * s * s * t * p[1] + 3. * s * t * t * p[2] + t * t * t * p[3],
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cubic_passes_through_end_points() {
        let spline = Spline::from_controls(
            3,
            vec![
                Vec3::ZERO,
                Vec3::new(0., 1., 0.),
                Vec3::new(1., 1., 0.),
                Vec3::new(1., 0., 0.),
                Vec3::new(1., -1., 0.),
                Vec3::new(2., -1., 0.),
                Vec3::new(2., 0., 0.),
            ],
        );
        assert_eq!(spline.curve_count(), 2);
        assert_eq!(spline.evaluate(SplineIndex::Global(0.)), Some(Vec3::ZERO));
        assert_eq!(
            spline.evaluate(SplineIndex::Global(0.5)),
            Some(Vec3::new(1., 0., 0.))
        );
        assert_eq!(
            spline.evaluate(SplineIndex::Global(1.)),
            Some(Vec3::new(2., 0., 0.))
        );
    }

    #[test]
    fn quadratic_midpoint() {
        let spline = Spline::from_controls(
            2,
            vec![Vec3::ZERO, Vec3::new(1., 2., 0.), Vec3::new(2., 0., 0.)],
        );
        let mid = spline.evaluate(SplineIndex::Local(0, 0.5)).unwrap();
        assert!((mid - Vec3::new(1., 1., 0.)).length() < 1e-6);
    }

    #[test]
    fn push_curve_keeps_straight_segments() {
        let mut spline = Spline::new(3);
        spline.push_curve(Vec3::ZERO);
        spline.push_curve(Vec3::new(0., 3., 0.));
        assert_eq!(spline.controls().len(), 4);
        assert_eq!(spline.curve_count(), 1);
        let mid = spline.evaluate(SplineIndex::Global(0.5)).unwrap();
        assert!((mid - Vec3::new(0., 1.5, 0.)).length() < 1e-5);
    }

    #[test]
    fn too_few_controls() {
        let mut spline = Spline::new(2);
        assert_eq!(spline.evaluate(SplineIndex::Global(0.3)), None);
        spline.set_controls(vec![Vec3::ONE]);
        assert_eq!(spline.curve_count(), 0);
        assert_eq!(spline.evaluate(SplineIndex::Global(0.3)), Some(Vec3::ONE));
    }

    #[test]
    fn profile_as_function() {
        let profile = Spline::default_profile();
        assert_eq!(profile.sample_y(-1.), Some(1.));
        assert!((profile.sample_y(0.25).unwrap() - 0.75).abs() < 1e-5);
        assert_eq!(profile.sample_y(2.), Some(0.));
        assert_eq!(Spline::flat(0.4).sample_y(0.7), Some(0.4));
    }
}
