//! Per-station outcomes and run summaries.

use std::fmt;

use serde::Serialize;
use weather_common::Dataset;

/// Terminal state of one station within one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StationOutcome {
    /// Rows inserted (observations) or written (forecasts); may be zero.
    Succeeded(u64),
    /// The station could not be queried at all.
    Skipped(String),
    /// Fetch or write failed; nothing was changed for this station.
    Failed(String),
    /// The run was cancelled before the station was reached.
    Cancelled,
}

impl StationOutcome {
    pub fn rows(&self) -> u64 {
        match self {
            StationOutcome::Succeeded(rows) => *rows,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StationOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationReport {
    pub station_id: String,
    pub outcome: StationOutcome,
}

/// Outcome of one engine run over all eligible stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dataset: Dataset,
    /// One entry per eligible station, in registry order.
    pub stations: Vec<StationReport>,
}

impl RunSummary {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            stations: Vec::new(),
        }
    }

    /// Best-effort count of new or replaced rows.
    pub fn total_rows(&self) -> u64 {
        self.stations.iter().map(|r| r.outcome.rows()).sum()
    }

    pub fn outcome_for(&self, station_id: &str) -> Option<&StationOutcome> {
        self.stations
            .iter()
            .find(|r| r.station_id == station_id)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(StationOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Skipped(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Cancelled))
    }

    fn count(&self, pred: impl Fn(&StationOutcome) -> bool) -> usize {
        self.stations.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows from {} stations ({} ok, {} failed, {} skipped, {} cancelled)",
            self.dataset,
            self.total_rows(),
            self.stations.len(),
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.cancelled()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, outcome: StationOutcome) -> StationReport {
        StationReport {
            station_id: id.into(),
            outcome,
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            dataset: Dataset::Observations,
            stations: vec![
                report("1", StationOutcome::Succeeded(24)),
                report("2", StationOutcome::Succeeded(0)),
                report("3", StationOutcome::Failed("timeout".into())),
                report("4", StationOutcome::Skipped("no location".into())),
                report("5", StationOutcome::Cancelled),
            ],
        };

        assert_eq!(summary.total_rows(), 24);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.cancelled(), 1);
        assert_eq!(summary.outcome_for("2"), Some(&StationOutcome::Succeeded(0)));
        assert_eq!(summary.outcome_for("9"), None);
        assert_eq!(
            summary.to_string(),
            "observations: 24 rows from 5 stations (2 ok, 1 failed, 1 skipped, 1 cancelled)"
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_string(&StationOutcome::Succeeded(3)).unwrap();
        assert_eq!(json, r#"{"status":"succeeded","detail":3}"#);
    }
}
