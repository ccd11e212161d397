//! Scenario results and the marker line that carries them out of a child process

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::DecodeStats;
use crate::session::{SessionMetadata, SessionSnapshot};
use crate::types::{AssetClass, PerformanceReport};
use crate::{BenchError, Result};

/// Prefix of the single stdout line that carries a run's result.
pub const RESULT_MARKER: &str = "benchresult:";

/// Everything one benchmark run measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub performance: PerformanceReport,
    pub total_frames: usize,
    #[serde(default)]
    pub session_metadata: Option<SessionMetadata>,
    #[serde(default)]
    pub asset_counts: BTreeMap<AssetClass, usize>,
    #[serde(default)]
    pub decode: Option<DecodeStats>,
}

impl ScenarioResult {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            performance: snapshot.performance,
            total_frames: snapshot.total_frames,
            session_metadata: snapshot.metadata.clone(),
            asset_counts: snapshot.assets.counts(),
            decode: snapshot.decode,
        }
    }

    /// Render the marker line, without a trailing newline.
    pub fn to_marker_line(&self) -> Result<String> {
        Ok(format!("{RESULT_MARKER}{}", serde_json::to_string(self)?))
    }
}

/// Parse a stdout line.
///
/// Returns `None` for ordinary output, and the parsed result (or the parse
/// failure) for a marker line.
pub fn parse_marker_line(line: &str) -> Option<Result<ScenarioResult>> {
    let json = line.trim_end_matches(['\r', '\n']).strip_prefix(RESULT_MARKER)?;
    Some(serde_json::from_str(json).map_err(BenchError::from))
}
