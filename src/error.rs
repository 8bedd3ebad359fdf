use crate::{
    dataset::DatasetError, geometry::GeometryError, ingest::IngestError, rowland::RowlandError,
};

/// Evaluation-pipeline error
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error("sagittal plane not configured, run a tilt survey first")]
    PlaneNotConfigured,
    #[error("no positions in the selected data slice")]
    EmptySlice,
    #[error("degenerate measurement geometry")]
    Geometry(#[from] GeometryError),
    #[error("data slice lookup failed")]
    Dataset(#[from] DatasetError),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `ingest` module")]
    Ingest(#[from] IngestError),
    #[error("Error in the `dataset` module")]
    Dataset(#[from] DatasetError),
    #[error("Error in the `geometry` module")]
    Geometry(#[from] GeometryError),
    #[error("Error in the `rowland` module")]
    Rowland(#[from] RowlandError),
    #[error("Error evaluating the survey data")]
    Eval(#[from] EvalError),
}
