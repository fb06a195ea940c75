//! Growth scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// DST-001: Poisson watch traffic across the whole window
    SteadyTraffic,

    /// DST-002: Concurrent watch burst at the curve peak
    FlashCrowd,

    /// DST-003: Concurrent first watches racing to draw targets
    FirstWatchRace,

    /// DST-004: First watch arrives after the window closed
    LateArrival,

    /// DST-005: Feature flag off, engine must not touch anything
    KillSwitch,

    /// DST-006: No bots seeded
    EmptyPool,

    /// DST-007: Video already at the comment cap from real viewers
    OrganicCrowd,

    /// DST-008: Store writes fail at random
    FlakyBackend,

    /// DST-009: Every watch rolls a like and a comment
    CommentSaturation,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyTraffic,
            ScenarioId::FlashCrowd,
            ScenarioId::FirstWatchRace,
            ScenarioId::LateArrival,
            ScenarioId::KillSwitch,
            ScenarioId::EmptyPool,
            ScenarioId::OrganicCrowd,
            ScenarioId::FlakyBackend,
            ScenarioId::CommentSaturation,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyTraffic => "steady_traffic",
            ScenarioId::FlashCrowd => "flash_crowd",
            ScenarioId::FirstWatchRace => "first_watch_race",
            ScenarioId::LateArrival => "late_arrival",
            ScenarioId::KillSwitch => "kill_switch",
            ScenarioId::EmptyPool => "empty_pool",
            ScenarioId::OrganicCrowd => "organic_crowd",
            ScenarioId::FlakyBackend => "flaky_backend",
            ScenarioId::CommentSaturation => "comment_saturation",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SteadyTraffic => "Exponential watch arrivals for 14h, views track the schedule",
            ScenarioId::FlashCrowd => "64 concurrent watches at hour 6, no lost view increments",
            ScenarioId::FirstWatchRace => "32 concurrent first watches, one set of targets wins",
            ScenarioId::LateArrival => "First watch 13h after upload, nothing is written",
            ScenarioId::KillSwitch => "Feature flag off for a full day of traffic",
            ScenarioId::EmptyPool => "Views grow with an empty bot pool, no likes or comments",
            ScenarioId::OrganicCrowd => "8 organic comments already exceed the cap of 6",
            ScenarioId::FlakyBackend => "30% of store writes fail, invariants still hold",
            ScenarioId::CommentSaturation => "Forced likes and comments, cap reached with distinct bots",
        }
    }

    /// Returns true if the scenario fires watches concurrently.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, ScenarioId::FlashCrowd | ScenarioId::FirstWatchRace)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady_traffic" | "steadytraffic" | "dst-001" => Ok(ScenarioId::SteadyTraffic),
            "flash_crowd" | "flashcrowd" | "dst-002" => Ok(ScenarioId::FlashCrowd),
            "first_watch_race" | "firstwatchrace" | "dst-003" => Ok(ScenarioId::FirstWatchRace),
            "late_arrival" | "latearrival" | "dst-004" => Ok(ScenarioId::LateArrival),
            "kill_switch" | "killswitch" | "dst-005" => Ok(ScenarioId::KillSwitch),
            "empty_pool" | "emptypool" | "dst-006" => Ok(ScenarioId::EmptyPool),
            "organic_crowd" | "organiccrowd" | "dst-007" => Ok(ScenarioId::OrganicCrowd),
            "flaky_backend" | "flakybackend" | "dst-008" => Ok(ScenarioId::FlakyBackend),
            "comment_saturation" | "commentsaturation" | "dst-009" => Ok(ScenarioId::CommentSaturation),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert_eq!("DST-004".parse::<ScenarioId>(), Ok(ScenarioId::LateArrival));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
