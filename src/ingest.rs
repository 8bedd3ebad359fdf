use std::{fs::File, io::Read, mem, path::Path, time::Instant};

use nalgebra::Point3;
use serde::Deserialize;

use crate::dataset::{AngleRecord, Dataset, PointGroup, PointsShape, RunRecord, Truncation};

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("Failed to open the survey file")]
    Io(#[from] std::io::Error),
}

/// Fields of a data row
const FIELDS: usize = 8;

/// One data row of the survey stream:
/// `collection, angle, run, actuator_position, point_index, x, y, z`
#[derive(Debug, Deserialize)]
struct RawRow {
    #[allow(dead_code)]
    collection: u32,
    angle: usize,
    run: usize,
    position: f64,
    point: usize,
    x: f64,
    y: f64,
    z: f64,
}

/// Parser states; a position is only flushed when the *next* row shows its
/// point index wrapped around (flush-on-next-row)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Filling the point buffer of the current actuator position
    AccumulatingPosition,
    /// The final point index has been seen; flush on the next row
    PositionComplete,
    /// The run field changed: the position map moves into the run map
    RunBoundary,
    /// The angle field changed: the run map moves into the dataset
    AngleBoundary,
    /// Terminal: one unconditional flush of buffer, position map and run map
    EndOfStream,
}

/// Streaming group parser reconstructing angle -> run -> position nesting
/// from the flat, order-dependent record stream
struct GroupParser {
    shape: PointsShape,
    state: ParserState,
    angle: usize,
    run: usize,
    /// Position value remembered when the buffer completed, keys the flush
    pending_position: f64,
    buffer: PointGroup,
    positions: RunRecord,
    runs: AngleRecord,
    dataset: Dataset,
}
impl GroupParser {
    fn new(shape: PointsShape) -> Self {
        Self {
            shape,
            state: ParserState::AccumulatingPosition,
            angle: 0,
            run: 0,
            pending_position: 0.,
            buffer: PointGroup::empty(shape),
            positions: RunRecord::new(),
            runs: AngleRecord::new(),
            dataset: Dataset {
                shape,
                ..Default::default()
            },
        }
    }

    fn set_state(&mut self, state: ParserState) {
        log::trace!("parser: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn flush_position(&mut self) {
        let mut group = mem::replace(&mut self.buffer, PointGroup::empty(self.shape));
        group.position = self.pending_position;
        self.positions.insert(self.pending_position.into(), group);
    }

    fn flush_run(&mut self) {
        self.runs.insert(self.run, mem::take(&mut self.positions));
    }

    fn flush_angle(&mut self) {
        self.dataset
            .angles
            .insert(self.angle, mem::take(&mut self.runs));
    }

    /// Transitions for one data row, in source order: pending-position flush,
    /// then the run boundary, then the angle boundary. On a row where both
    /// run and angle change, the angle boundary must not flush the position
    /// map a second time.
    fn feed(&mut self, row: &RawRow) {
        if self.state == ParserState::PositionComplete {
            self.flush_position();
            self.set_state(ParserState::AccumulatingPosition);
        }
        self.buffer.points[row.point] = Point3::new(row.x, row.y, row.z);
        if row.point == self.shape.last_index() {
            self.pending_position = row.position;
            self.set_state(ParserState::PositionComplete);
        }
        let resume = self.state;
        let run_changed = row.run != self.run;
        if run_changed {
            self.set_state(ParserState::RunBoundary);
            self.flush_run();
            self.run = row.run;
        }
        if row.angle != self.angle {
            self.set_state(ParserState::AngleBoundary);
            if !run_changed {
                self.flush_run();
            }
            self.flush_angle();
            self.angle = row.angle;
            self.run = 0;
        }
        if self.state != resume {
            self.set_state(resume);
        }
    }

    /// Terminal transition: flush whatever is pending so the last group in
    /// the stream is never dropped
    fn finish(mut self, truncation: Option<Truncation>) -> Dataset {
        self.flush_position();
        self.flush_run();
        self.flush_angle();
        self.set_state(ParserState::EndOfStream);
        self.dataset.truncation = truncation;
        self.dataset
    }
}

/// Survey file loader
///
/// ```no_run
/// use parse_sagittal::SurveyLoader;
/// let dataset = SurveyLoader::default()
///     .data_path("2016-03-31-all_points.dat")
///     .load()
///     .unwrap();
/// ```
pub struct SurveyLoader {
    path: String,
    shape: PointsShape,
}
impl Default for SurveyLoader {
    fn default() -> Self {
        Self {
            path: String::from("all_points.dat"),
            shape: PointsShape::default(),
        }
    }
}
impl SurveyLoader {
    pub fn data_path<S: AsRef<Path>>(self, data_path: S) -> Self {
        Self {
            path: data_path.as_ref().to_string_lossy().into_owned(),
            ..self
        }
    }
    pub fn points_shape(self, shape: PointsShape) -> Self {
        Self { shape, ..self }
    }
    /// Load and parse the survey file
    ///
    /// A malformed row stops ingestion at that row: the dataset then carries
    /// everything flushed up to it together with a [`Truncation`] marker.
    pub fn load(self) -> Result<Dataset, IngestError> {
        let file = File::open(Path::new(&self.path))?;
        log::info!("Loading {:?}...", self.path);
        let now = Instant::now();
        let dataset = self.read(file);
        log::info!("... loaded in {}ms", now.elapsed().as_millis());
        Ok(dataset)
    }
    /// Parse a survey record stream from any reader
    pub fn read<R: Read>(&self, reader: R) -> Dataset {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut parser = GroupParser::new(self.shape);
        let mut truncation = None;
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    truncation = Some(Truncation {
                        line: err.position().map(|p| p.line()).unwrap_or(0),
                        row: String::new(),
                        reason: err.to_string(),
                    });
                    break;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let raw = record.iter().collect::<Vec<_>>().join(", ");
            if record.len() != FIELDS {
                truncation = Some(Truncation {
                    line,
                    row: raw,
                    reason: format!("expected {} fields, found {}", FIELDS, record.len()),
                });
                break;
            }
            let row: RawRow = match record.deserialize(None) {
                Ok(row) => row,
                Err(err) => {
                    truncation = Some(Truncation {
                        line,
                        row: raw,
                        reason: err.to_string(),
                    });
                    break;
                }
            };
            if row.point >= self.shape.len() {
                truncation = Some(Truncation {
                    line,
                    row: raw,
                    reason: format!(
                        "point index {} out of range 0..{}",
                        row.point,
                        self.shape.len()
                    ),
                });
                break;
            }
            parser.feed(&row);
        }
        if let Some(t) = &truncation {
            log::error!("{}", t);
        }
        parser.finish(truncation)
    }
}
