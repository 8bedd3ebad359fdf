use std::{fmt, ops::Deref};

use nalgebra::{Point3, Rotation3, Vector3};

use crate::{
    dataset::RunRecord,
    error::EvalError,
    geometry::{GeometryError, Plane},
};

/// Mean and population standard deviation (ddof = 0)
fn stats(x: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let std = (x.iter().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / n).sqrt();
    (mean, std)
}

/// Tilt angle [deg] implied by the centre-analyzer chord from the front-ring
/// point to its back-ring counterpart: `theta = 90 - atan((z0-z6)/(y6-y0))`
pub fn tilt_angle(front: &Point3<f64>, back: &Point3<f64>) -> Result<f64, GeometryError> {
    let dy = back.y - front.y;
    if dy == 0. {
        return Err(GeometryError::VerticalChord {
            front: *front,
            back: *back,
        });
    }
    let beta = ((front.z - back.z) / dy).atan();
    Ok(90. - beta.to_degrees())
}

/// Per-position tilt estimates over one angle/run slice, with their
/// aggregate statistics
///
/// Inspection-only product of the plane estimator; build the actual plane
/// with [`SagittalPlane::from_survey`].
#[derive(Debug, Clone)]
pub struct TiltSurvey {
    /// Actuator positions, in slice order
    pub positions: Vec<f64>,
    /// Tilt angle estimate per position [deg]
    pub thetas: Vec<f64>,
    pub theta_mean: f64,
    /// Population standard deviation of the tilt estimates [deg]
    pub theta_std: f64,
    /// Mean front-ring centre point [mm]
    pub p0_mean: Point3<f64>,
    /// Per-coordinate population standard deviation of the centre point [mm]
    pub p0_std: Vector3<f64>,
}
impl fmt::Display for TiltSurvey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "th0_mean = {:.4} +/- {:.4} deg ({} positions)",
            self.theta_mean,
            self.theta_std,
            self.thetas.len()
        )?;
        writeln!(
            f,
            "P0_mean  = ({:.4}, {:.4}, {:.4}) mm",
            self.p0_mean.x, self.p0_mean.y, self.p0_mean.z
        )?;
        write!(
            f,
            "P0_std   = ({:.4}, {:.4}, {:.4}) mm",
            self.p0_std.x, self.p0_std.y, self.p0_std.z
        )
    }
}

/// Estimate the rig tilt from every position of one angle/run slice
///
/// A vertical centre-analyzer chord on any position is reported as a
/// [`GeometryError::VerticalChord`] with the offending points attached.
pub fn survey_tilt(slice: &RunRecord) -> Result<TiltSurvey, EvalError> {
    if slice.is_empty() {
        return Err(EvalError::EmptySlice);
    }
    let mut positions = Vec::with_capacity(slice.len());
    let mut thetas = Vec::with_capacity(slice.len());
    let mut p0s = Vec::with_capacity(slice.len());
    for (key, group) in slice {
        let front = group.front_center();
        let back = group.back_center();
        let theta = tilt_angle(front, back).map_err(|e| {
            log::error!("tilt estimate failed at position {}: {}", key, e);
            e
        })?;
        positions.push(key.value());
        thetas.push(theta);
        p0s.push(*front);
    }
    let (theta_mean, theta_std) = stats(&thetas);
    let (x_mean, x_std) = stats(&p0s.iter().map(|p| p.x).collect::<Vec<_>>());
    let (y_mean, y_std) = stats(&p0s.iter().map(|p| p.y).collect::<Vec<_>>());
    let (z_mean, z_std) = stats(&p0s.iter().map(|p| p.z).collect::<Vec<_>>());
    Ok(TiltSurvey {
        positions,
        thetas,
        theta_mean,
        theta_std,
        p0_mean: Point3::new(x_mean, y_mean, z_mean),
        p0_std: Vector3::new(x_std, y_std, z_std),
    })
}

/// The sagittal reference plane `Ax + By + Cz + D = 0`, oriented by the mean
/// rig tilt and anchored at the mean centre-analyzer point
#[derive(Debug, Clone, Copy)]
pub struct SagittalPlane {
    plane: Plane,
    /// Tilt angle the plane was built at [deg]
    pub theta0: f64,
    /// Point the plane is anchored at
    pub anchor: Point3<f64>,
}
impl Deref for SagittalPlane {
    type Target = Plane;

    fn deref(&self) -> &Self::Target {
        &self.plane
    }
}
impl SagittalPlane {
    /// Plane at the survey's mean tilt angle through its mean centre point
    pub fn from_survey(survey: &TiltSurvey) -> Self {
        Self::at(survey.theta_mean, survey.p0_mean)
    }
    /// Plane at tilt `theta0` [deg] through `anchor`: the unit Z vector
    /// rotated about the X axis by `90 - theta0`
    pub fn at(theta0: f64, anchor: Point3<f64>) -> Self {
        let phi = (90. - theta0).to_radians();
        let normal = Rotation3::from_axis_angle(&Vector3::x_axis(), -phi) * Vector3::z();
        Self {
            plane: Plane::through(normal, &anchor),
            theta0,
            anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{PointGroup, PointsShape};
    use crate::geometry::EPSILON;

    fn group_with_chord(pos: f64, front: Point3<f64>, back: Point3<f64>) -> PointGroup {
        let mut group = PointGroup::empty(PointsShape::Twelve);
        group.position = pos;
        group.points[0] = front;
        group.points[6] = back;
        group
    }

    #[test]
    fn tilt_of_unit_slope_is_45_deg() {
        let front = Point3::new(0., 0., 10.);
        let back = Point3::new(0., 10., 0.);
        assert!((tilt_angle(&front, &back).unwrap() - 45.).abs() < 1e-12);
    }

    #[test]
    fn vertical_chord_is_rejected() {
        let front = Point3::new(0., 5., 10.);
        let back = Point3::new(0., 5., 0.);
        assert!(matches!(
            tilt_angle(&front, &back),
            Err(GeometryError::VerticalChord { .. })
        ));
    }

    #[test]
    fn survey_aggregates_positions() {
        let mut slice = RunRecord::new();
        for (i, pos) in [0., 10., 20.].iter().enumerate() {
            let front = Point3::new(i as f64, 0., 10.);
            let back = Point3::new(i as f64, 10., 0.);
            slice.insert((*pos).into(), group_with_chord(*pos, front, back));
        }
        let survey = survey_tilt(&slice).unwrap();
        assert_eq!(survey.positions, vec![0., 10., 20.]);
        assert!((survey.theta_mean - 45.).abs() < 1e-12);
        assert_eq!(survey.theta_std, 0.);
        assert_eq!(survey.p0_mean, Point3::new(1., 0., 10.));
        assert!(survey.p0_std.y.abs() < 1e-12);
    }

    #[test]
    fn empty_slice_is_rejected() {
        assert!(matches!(
            survey_tilt(&RunRecord::new()),
            Err(EvalError::EmptySlice)
        ));
    }

    #[test]
    fn plane_orientation_round_trips_the_tilt() {
        // a plane built at theta0 must imply theta0 through the tilt formula
        let theta0 = 55f64;
        let plane = SagittalPlane::at(theta0, Point3::origin());
        let phi = (90. - theta0).to_radians();
        assert!((plane.normal - Vector3::new(0., phi.sin(), phi.cos())).norm() < 1e-12);
        // an in-plane chord with mixed basis components
        let e2 = Vector3::new(0., phi.cos(), -phi.sin());
        let front = Point3::origin();
        let back = front + Vector3::x() * 3. + e2 * 7.;
        assert!(plane.contains(&back, EPSILON));
        assert!((tilt_angle(&front, &back).unwrap() - theta0).abs() < 1e-9);
    }

    #[test]
    fn plane_passes_through_anchor() {
        let anchor = Point3::new(-30., 250., 120.);
        let plane = SagittalPlane::at(35., anchor);
        assert!(plane.distance_to(&anchor) < EPSILON);
    }
}
