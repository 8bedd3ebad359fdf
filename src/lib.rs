//! Sagittal focusing test rig metrology
//!
//! Parses the point coordinates measured on the sagittal bender prototype
//! (6 analyzers, 12 or 13 points per actuator position), reconstructs the
//! sagittal reference plane and circle they imply, and verifies the exact
//! Rowland tracking of each analyzer.

pub mod bench;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod plane;
pub mod radius;
pub mod results;
pub mod rowland;

pub use bench::SagittalBench;
pub use dataset::{Dataset, PointsShape, Truncation};
pub use error::{Error, EvalError};
pub use geometry::GeometryError;
pub use ingest::SurveyLoader;
pub use plane::{SagittalPlane, TiltSurvey};
pub use radius::PositionEvaluation;
pub use results::{evaluate_all, AngleEvaluation, EvaluationResult, RadiusTable};
pub use rowland::{RigAngle, RowlandCircle};
