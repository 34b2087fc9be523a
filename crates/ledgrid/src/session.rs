//! Serializable session state.
//!
//! The core neither reads nor writes files; it only defines the structure a
//! host (GUI or CLI) persists between sittings: the image reference, the
//! alignment the user produced, the run parameters, and the last measurement
//! table.

use serde::{Deserialize, Serialize};

use crate::grid::Point;
use crate::measure::{MeasureMethod, SampleParams};
use crate::Measurement;

/// Current session schema tag.
pub const SESSION_SCHEMA: &str = "ledgrid.session.v1";

/// One persisted measurement session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Schema tag; hosts should reject unknown versions.
    pub schema: String,
    /// Path of the measured image, as the host referenced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Path of the background frame, if one was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_path: Option<String>,
    /// Logical array size (n for an n×n grid).
    pub array_size: usize,
    /// Grid corner / boundary points in TL, TR, BR, BL order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners: Option<Vec<Point>>,
    /// Manual click positions, row-major, when manual mode was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_points: Option<Vec<Point>>,
    /// Sampling parameters of the last run.
    pub sample: SampleParams,
    /// Measurement method of the last run.
    pub method: MeasureMethod,
    /// Last measurement table, row-major.
    pub measurements: Vec<Measurement>,
}

impl SessionState {
    /// Fresh session for an n×n array with nothing measured yet.
    pub fn empty(array_size: usize) -> Self {
        Self {
            schema: SESSION_SCHEMA.to_string(),
            image_path: None,
            background_path: None,
            array_size,
            corners: None,
            manual_points: None,
            sample: SampleParams::default(),
            method: MeasureMethod::default(),
            measurements: Vec::new(),
        }
    }

    /// True when the schema tag matches the version this build writes.
    pub fn is_current_schema(&self) -> bool {
        self.schema == SESSION_SCHEMA
    }
}
