use std::fmt;

use nalgebra::Point3;
use rayon::prelude::*;

use crate::{
    dataset::Dataset,
    error::EvalError,
    plane::{survey_tilt, SagittalPlane, TiltSurvey},
    radius::{evaluate_run, PositionEvaluation},
};

/// Per-position evaluations collected into four aligned sequences,
/// indexed by encounter order
#[derive(Debug, Clone, Default)]
pub struct EvaluationResult {
    /// Actuator positions (spec values) [mm]
    pub positions: Vec<f64>,
    /// Sagittal circle centres
    pub centers: Vec<Point3<f64>>,
    /// 12 radii per position [mm]
    pub radii: Vec<Vec<f64>>,
    /// 10 chi angles per position [deg]
    pub chis: Vec<Vec<f64>>,
}
impl EvaluationResult {
    pub fn len(&self) -> usize {
        self.positions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
    pub fn push(&mut self, eval: PositionEvaluation) {
        self.positions.push(eval.position);
        self.centers.push(eval.center);
        self.radii.push(eval.radii);
        self.chis.push(eval.chis);
    }
    /// Radius of the centre analyzer per position [mm]
    pub fn central_radii(&self) -> impl Iterator<Item = f64> + '_ {
        self.radii.iter().map(|rs| rs[0])
    }
    /// Radius deviations of analyzers 1..6 from the centre analyzer,
    /// one 5-vector per position [mm]
    pub fn radius_deviations(&self) -> Vec<Vec<f64>> {
        self.radii
            .iter()
            .map(|rs| (1..6).map(|i| rs[i] - rs[0]).collect())
            .collect()
    }
    /// Mean absolute radius scatter per position, front and back ring
    /// spreads averaged [mm]
    pub fn radius_spread(&self) -> Vec<f64> {
        self.radii
            .iter()
            .map(|rs| (mean_abs_dev(&rs[..6]) + mean_abs_dev(&rs[6..])) / 2.)
            .collect()
    }
    /// Mean absolute chi scatter per position [deg]
    pub fn chi_spread(&self) -> Vec<f64> {
        self.chis.iter().map(|chi| mean_abs_dev(chi)).collect()
    }
}
impl FromIterator<PositionEvaluation> for EvaluationResult {
    fn from_iter<T: IntoIterator<Item = PositionEvaluation>>(iter: T) -> Self {
        let mut result = Self::default();
        result.extend(iter);
        result
    }
}
impl Extend<PositionEvaluation> for EvaluationResult {
    fn extend<T: IntoIterator<Item = PositionEvaluation>>(&mut self, iter: T) {
        for eval in iter {
            self.push(eval);
        }
    }
}

fn mean_abs_dev(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    x.iter().map(|v| (v - mean).abs()).sum::<f64>() / n
}

/// Fixed-width radius report for one angle/run
pub struct RadiusTable<'a> {
    pub angle: usize,
    pub run: usize,
    pub result: &'a EvaluationResult,
}
impl fmt::Display for RadiusTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>3} {:>3} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "ang", "run", "pos", "rs0", "drs1", "drs2", "drs3", "drs4", "drs5"
        )?;
        writeln!(
            f,
            "{:>3} {:>3} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "#", "#", "spec", "mm", "mm", "mm", "mm", "mm", "mm"
        )?;
        for (pos, rs) in self.result.positions.iter().zip(self.result.radii.iter()) {
            writeln!(
                f,
                "{:>3} {:>3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
                self.angle,
                self.run,
                pos,
                rs[0],
                rs[1] - rs[0],
                rs[2] - rs[0],
                rs[3] - rs[0],
                rs[4] - rs[0],
                rs[5] - rs[0]
            )?;
        }
        Ok(())
    }
}

/// Survey and evaluation of one angle slice
#[derive(Debug, Clone)]
pub struct AngleEvaluation {
    pub angle: usize,
    pub survey: TiltSurvey,
    pub plane: SagittalPlane,
    pub result: EvaluationResult,
}

/// Evaluate the given run of every angle in the dataset
///
/// Angle slices are mutually independent, so they are processed in parallel;
/// results come back in ascending angle order.
pub fn evaluate_all(dataset: &Dataset, run: usize) -> Result<Vec<AngleEvaluation>, EvalError> {
    dataset
        .angle_indices()
        .into_par_iter()
        .map(|angle| {
            let slice = dataset.slice(angle, run)?;
            let survey = survey_tilt(slice)?;
            let plane = SagittalPlane::from_survey(&survey);
            let result = evaluate_run(slice, &plane)?.into_iter().collect();
            Ok(AngleEvaluation {
                angle,
                survey,
                plane,
                result,
            })
        })
        .collect()
}
