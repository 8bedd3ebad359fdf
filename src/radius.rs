use itertools::Itertools;
use nalgebra::Point3;

use crate::{
    dataset::{PointGroup, RunRecord, BACK_CENTER, FRONT_CENTER, RING_POINTS},
    error::EvalError,
    geometry::{angle_between, circle_through_three_points, line_line_intersection},
    plane::SagittalPlane,
};

/// Chord through the centre analyzer pair (front 0, back 6)
const CENTER_CHORD: (usize, usize) = (FRONT_CENTER, BACK_CENTER);
/// Chord through the outermost analyzer pair (front 5, back 11)
const EXTREME_CHORD: (usize, usize) = (5, 11);

/// Sagittal circle reconstruction for one actuator position
#[derive(Debug, Clone)]
pub struct PositionEvaluation {
    /// Actuator position (spec value) [mm]
    pub position: f64,
    /// Sagittal circle centre on the reference plane
    pub center: Point3<f64>,
    /// Distance of each of the 12 unprojected points from the centre [mm]
    pub radii: Vec<f64>,
    /// Angular spacing of consecutive projected points seen from the centre,
    /// front ring 0..4 then back ring 6..10 [deg]
    pub chis: Vec<f64>,
}

/// Evaluate the sagittal circle of a single position against the plane
pub fn evaluate_position(
    group: &PointGroup,
    plane: &SagittalPlane,
) -> Result<PositionEvaluation, EvalError> {
    let projected: Vec<Point3<f64>> = group
        .ring_points()
        .iter()
        .map(|p| plane.project(p))
        .collect();
    let center = line_line_intersection(
        (&projected[CENTER_CHORD.0], &projected[CENTER_CHORD.1]),
        (&projected[EXTREME_CHORD.0], &projected[EXTREME_CHORD.1]),
    )?;
    // radii are taken in full 3-D space from the measured points
    let radii: Vec<f64> = group
        .ring_points()
        .iter()
        .map(|p| (p - center).norm())
        .collect();
    let mut chis = Vec::with_capacity(RING_POINTS - 2);
    for ring in [&projected[..6], &projected[6..]] {
        for (a, b) in ring.iter().tuple_windows() {
            chis.push(angle_between(&center, a, b)?);
        }
    }
    Ok(PositionEvaluation {
        position: group.position,
        center,
        radii,
        chis,
    })
}

/// Evaluate every position of one angle/run slice, in slice order
pub fn evaluate_run(
    slice: &RunRecord,
    plane: &SagittalPlane,
) -> Result<Vec<PositionEvaluation>, EvalError> {
    if slice.is_empty() {
        return Err(EvalError::EmptySlice);
    }
    slice
        .values()
        .map(|group| evaluate_position(group, plane))
        .collect()
}

/// Distances of the measured points from the reference plane, per point index
#[derive(Debug, Clone)]
pub struct PlaneDistances {
    /// Actuator positions, in slice order
    pub positions: Vec<f64>,
    /// `by_point[point_index][position_index]` [mm]
    pub by_point: Vec<Vec<f64>>,
}

/// How far each analyzer point sits off the plane across a whole slice
pub fn plane_distances(slice: &RunRecord, plane: &SagittalPlane) -> PlaneDistances {
    let mut positions = Vec::with_capacity(slice.len());
    let mut by_point = vec![Vec::with_capacity(slice.len()); RING_POINTS];
    for group in slice.values() {
        positions.push(group.position);
        for (ipt, p) in group.ring_points().iter().enumerate() {
            by_point[ipt].push(plane.distance_to(p));
        }
    }
    PlaneDistances {
        positions,
        by_point,
    }
}

/// Circle fit through three points of one ring
#[derive(Debug, Clone, Copy)]
pub struct CircleFit {
    pub radius: f64,
    pub center: Point3<f64>,
}

/// Front/back ring circle fits for one position, from the measured points
/// and, when requested, from their projections onto the plane
#[derive(Debug, Clone)]
pub struct RingFit {
    pub position: f64,
    pub front: CircleFit,
    pub back: CircleFit,
    pub front_projected: Option<CircleFit>,
    pub back_projected: Option<CircleFit>,
}
impl RingFit {
    /// Back minus front measured radius [mm]
    pub fn delta(&self) -> f64 {
        self.back.radius - self.front.radius
    }
}

// ring sample points for the three-point fits
const FRONT_FIT: [usize; 3] = [0, 3, 5];
const BACK_FIT: [usize; 3] = [6, 9, 11];

fn fit(points: &[Point3<f64>], idx: &[usize; 3]) -> Result<CircleFit, EvalError> {
    let (radius, center) =
        circle_through_three_points(&points[idx[0]], &points[idx[1]], &points[idx[2]])?;
    Ok(CircleFit { radius, center })
}

/// Measured sagittal radius per position from three-point ring fits
pub fn measured_radii(
    slice: &RunRecord,
    plane: Option<&SagittalPlane>,
) -> Result<Vec<RingFit>, EvalError> {
    slice
        .values()
        .map(|group| {
            let front = fit(group.ring_points(), &FRONT_FIT)?;
            let back = fit(group.ring_points(), &BACK_FIT)?;
            let (front_projected, back_projected) = match plane {
                Some(plane) => {
                    let projected: Vec<Point3<f64>> = group
                        .ring_points()
                        .iter()
                        .map(|p| plane.project(p))
                        .collect();
                    (
                        Some(fit(&projected, &FRONT_FIT)?),
                        Some(fit(&projected, &BACK_FIT)?),
                    )
                }
                None => (None, None),
            };
            Ok(RingFit {
                position: group.position,
                front,
                back,
                front_projected,
                back_projected,
            })
        })
        .collect()
}
