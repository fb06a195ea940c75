//! JSON exporter for growth curves.
//!
//! Exports sampled simulation frames so a run's view curve can be plotted
//! against the expected schedule.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Hours since upload
    pub time_hours: f64,

    pub view_count: u64,

    /// Where the linear schedule says the counter should be
    pub expected_views: u64,

    /// What feed cards show (never below the target)
    pub displayed_views: u64,

    pub likes: u64,
    pub comments: u64,

    /// Bell-curve intensity at this time
    pub curve_factor: f64,

    /// Events (injected failures, window close, etc.)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Time of the last frame, in hours since upload
    pub duration_hours: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_views: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_views: Option<u64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_hours: 0.0,
            frames: Vec::new(),
            passed: false,
            target_views: None,
            final_views: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_hours = frame.time_hours;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, target_views: Option<u64>, final_views: Option<u64>) {
        self.passed = passed;
        self.target_views = target_views;
        self.final_views = final_views;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
