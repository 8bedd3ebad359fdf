use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use nalgebra::Point3;

/// Number of analyzer reference points per actuator position (front + back ring)
pub const RING_POINTS: usize = 12;
/// Front-ring point of the centre analyzer
pub const FRONT_CENTER: usize = 0;
/// Back-ring point of the centre analyzer
pub const BACK_CENTER: usize = 6;

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("no data for angle {angle}, run {run}")]
    MissingSlice { angle: usize, run: usize },
    #[error("unsupported points-per-position count: {0} (expected 12 or 13)")]
    BadShape(String),
}

/// Number of points recorded per actuator position: the 12 analyzer edge
/// points, optionally followed by a redundant actuator readout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointsShape {
    #[default]
    Twelve,
    Thirteen,
}
impl PointsShape {
    pub fn len(self) -> usize {
        match self {
            PointsShape::Twelve => 12,
            PointsShape::Thirteen => 13,
        }
    }
    pub fn last_index(self) -> usize {
        self.len() - 1
    }
}
impl FromStr for PointsShape {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "12" => Ok(PointsShape::Twelve),
            "13" => Ok(PointsShape::Thirteen),
            other => Err(DatasetError::BadShape(other.to_string())),
        }
    }
}

/// Actuator position used as an ordered map key
///
/// Wraps the raw "spec" position value with a total order so that run maps
/// iterate in ascending-position order.
#[derive(Debug, Clone, Copy)]
pub struct PositionKey(f64);
impl PositionKey {
    pub fn value(self) -> f64 {
        self.0
    }
}
impl From<f64> for PositionKey {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl PartialEq for PositionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for PositionKey {}
impl PartialOrd for PositionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PositionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The measured points of one actuator position
#[derive(Debug, Clone, Default)]
pub struct PointGroup {
    /// Actuator position (spec value) [mm]
    pub position: f64,
    /// Measured coordinates indexed by point index [mm]
    pub points: Vec<Point3<f64>>,
}
impl PointGroup {
    pub(crate) fn empty(shape: PointsShape) -> Self {
        Self {
            position: 0.,
            points: vec![Point3::origin(); shape.len()],
        }
    }
    /// The front-ring point of the centre analyzer
    pub fn front_center(&self) -> &Point3<f64> {
        &self.points[FRONT_CENTER]
    }
    /// The back-ring point of the centre analyzer
    pub fn back_center(&self) -> &Point3<f64> {
        &self.points[BACK_CENTER]
    }
    /// The 12 analyzer edge points, excluding any redundant actuator readout
    pub fn ring_points(&self) -> &[Point3<f64>] {
        &self.points[..RING_POINTS]
    }
}

/// One measurement run (repeat) at a fixed rig angle
pub type RunRecord = BTreeMap<PositionKey, PointGroup>;
/// All runs recorded at one rig angle
pub type AngleRecord = BTreeMap<usize, RunRecord>;

/// Marker left in a [`Dataset`] when ingestion stopped at a malformed row
#[derive(Debug, Clone)]
pub struct Truncation {
    /// 1-based line number of the offending row
    pub line: u64,
    /// Raw row content
    pub row: String,
    pub reason: String,
}
impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ingestion stopped at line {}: [{}] ({})",
            self.line, self.row, self.reason
        )
    }
}

/// The full three-level survey dataset: angle -> run -> actuator position
///
/// Built once by [`crate::ingest::SurveyLoader`] and read-only thereafter.
#[derive(Debug, Default)]
pub struct Dataset {
    pub angles: BTreeMap<usize, AngleRecord>,
    pub shape: PointsShape,
    /// Set when ingestion stopped early; the dataset then holds everything
    /// flushed before the offending row
    pub truncation: Option<Truncation>,
}
impl Dataset {
    /// All position records for one angle/run
    pub fn slice(&self, angle: usize, run: usize) -> Result<&RunRecord, DatasetError> {
        self.angles
            .get(&angle)
            .and_then(|runs| runs.get(&run))
            .ok_or(DatasetError::MissingSlice { angle, run })
    }
    /// Angle indices present in the dataset
    pub fn angle_indices(&self) -> Vec<usize> {
        self.angles.keys().copied().collect()
    }
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }
    pub fn len(&self) -> usize {
        self.angles.len()
    }
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}
