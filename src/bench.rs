use crate::{
    dataset::Dataset,
    error::EvalError,
    plane::{survey_tilt, SagittalPlane, TiltSurvey},
    radius::{evaluate_run, measured_radii, plane_distances, PlaneDistances, RingFit},
    results::{evaluate_all, AngleEvaluation, EvaluationResult},
    rowland::RowlandCircle,
};

/// One evaluation session over a survey dataset
///
/// Owns the dataset and the Rowland model it is verified against; the
/// sagittal plane is only available after a tilt survey and every evaluation
/// method fails fast without it. The underlying per-slice functions in
/// [`crate::plane`] and [`crate::radius`] take the plane as an explicit
/// argument and stay reusable in isolation.
pub struct SagittalBench {
    pub rowland: RowlandCircle,
    pub dataset: Dataset,
    plane: Option<SagittalPlane>,
}
impl SagittalBench {
    pub fn new(rowland: RowlandCircle, dataset: Dataset) -> Self {
        Self {
            rowland,
            dataset,
            plane: None,
        }
    }
    pub fn plane(&self) -> Option<&SagittalPlane> {
        self.plane.as_ref()
    }
    fn configured_plane(&self) -> Result<&SagittalPlane, EvalError> {
        self.plane.as_ref().ok_or(EvalError::PlaneNotConfigured)
    }
    /// Tilt survey of one angle/run slice, setting the sagittal plane at the
    /// mean tilt and centre point
    pub fn survey(&mut self, angle: usize, run: usize) -> Result<TiltSurvey, EvalError> {
        let survey = self.survey_only(angle, run)?;
        self.plane = Some(SagittalPlane::from_survey(&survey));
        Ok(survey)
    }
    /// Tilt survey without touching the session plane (inspection only)
    pub fn survey_only(&self, angle: usize, run: usize) -> Result<TiltSurvey, EvalError> {
        survey_tilt(self.dataset.slice(angle, run)?)
    }
    /// Sagittal circle evaluation of one angle/run slice against the
    /// session plane
    pub fn evaluate(&self, angle: usize, run: usize) -> Result<EvaluationResult, EvalError> {
        let plane = self.configured_plane()?;
        let slice = self.dataset.slice(angle, run)?;
        Ok(evaluate_run(slice, plane)?.into_iter().collect())
    }
    /// Point-to-plane distances of one angle/run slice
    pub fn plane_distances(&self, angle: usize, run: usize) -> Result<PlaneDistances, EvalError> {
        let plane = self.configured_plane()?;
        Ok(plane_distances(self.dataset.slice(angle, run)?, plane))
    }
    /// Three-point ring fits of one angle/run slice, projected onto the
    /// session plane when one is configured
    pub fn measured_radii(&self, angle: usize, run: usize) -> Result<Vec<RingFit>, EvalError> {
        measured_radii(self.dataset.slice(angle, run)?, self.plane())
    }
    /// Survey and evaluate the given run of every angle, each against its
    /// own per-angle plane
    pub fn evaluate_all(&self, run: usize) -> Result<Vec<AngleEvaluation>, EvalError> {
        evaluate_all(&self.dataset, run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_requires_a_plane() {
        let bench = SagittalBench::new(RowlandCircle::default(), Dataset::default());
        assert!(matches!(
            bench.evaluate(0, 0),
            Err(EvalError::PlaneNotConfigured)
        ));
        assert!(matches!(
            bench.plane_distances(0, 0),
            Err(EvalError::PlaneNotConfigured)
        ));
    }

    #[test]
    fn missing_slice_is_propagated() {
        let mut bench = SagittalBench::new(RowlandCircle::default(), Dataset::default());
        assert!(matches!(
            bench.survey(3, 1),
            Err(EvalError::Dataset(_))
        ));
    }
}
