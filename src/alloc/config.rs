//! Arena configuration.

use serde::{Deserialize, Serialize};

/// What happens to values that are still constructed when the arena is
/// dropped or reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeardownPolicy {
    /// Release the chunks without running any destructor.
    ///
    /// Callers must `destroy` every value they constructed before the arena
    /// goes away; anything left behind is leaked (never freed twice).
    #[default]
    Leak,
    /// Drop every still-constructed value before releasing the chunks.
    DropLive,
}

/// Configuration for [`ChunkArena`](crate::alloc::ChunkArena).
///
/// Chunk capacity is a const generic of the arena and is not part of the
/// configuration. All values are fixed once the arena is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Destructor policy for values left constructed at teardown.
    pub teardown: TeardownPolicy,

    /// Record the length of every allocated run and reject deallocations
    /// whose pointer or length does not match a recorded run.
    ///
    /// Costs one `usize` per slot. Default: on in debug builds, off in release.
    pub track_runs: bool,
}

impl ArenaConfig {
    /// Default configuration: `Leak` teardown, run tracking in debug builds.
    pub const fn new() -> Self {
        Self {
            teardown: TeardownPolicy::Leak,
            track_runs: cfg!(debug_assertions),
        }
    }

    /// Sets the teardown policy.
    #[must_use]
    pub const fn with_teardown(mut self, teardown: TeardownPolicy) -> Self {
        self.teardown = teardown;
        self
    }

    /// Enables or disables run tracking.
    #[must_use]
    pub const fn with_run_tracking(mut self, track_runs: bool) -> Self {
        self.track_runs = track_runs;
        self
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time summary of arena usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    /// Number of chunks currently owned.
    pub chunks: usize,
    /// Slots per chunk.
    pub slots_per_chunk: usize,
    /// Reserved slots across all chunks.
    pub reserved: usize,
    /// Slots holding a constructed value.
    pub live: usize,
}

impl ArenaStats {
    /// Total slots across all chunks.
    pub fn total_slots(&self) -> usize {
        self.chunks.saturating_mul(self.slots_per_chunk)
    }

    /// Unreserved slots across all chunks.
    pub fn free(&self) -> usize {
        self.total_slots().saturating_sub(self.reserved)
    }

    /// Fraction of slots reserved, in `[0, 1]`. An arena without chunks reports 0.
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        match self.total_slots() {
            0 => 0.0,
            total => self.reserved as f64 / total as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_leak() {
        let config = ArenaConfig::default();
        assert_eq!(config.teardown, TeardownPolicy::Leak);
        assert_eq!(config.track_runs, cfg!(debug_assertions));
    }

    #[test]
    fn builder_overrides() {
        let config = ArenaConfig::new()
            .with_teardown(TeardownPolicy::DropLive)
            .with_run_tracking(true);
        assert_eq!(config.teardown, TeardownPolicy::DropLive);
        assert!(config.track_runs);
    }

    #[test]
    fn stats_derived_counts() {
        let stats = ArenaStats {
            chunks: 2,
            slots_per_chunk: 10,
            reserved: 15,
            live: 4,
        };
        assert_eq!(stats.total_slots(), 20);
        assert_eq!(stats.free(), 5);
        assert!((stats.utilization() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_from_untrusted_input_saturate() {
        let stats: ArenaStats = serde_json::from_str(
            r#"{"chunks":1,"slots_per_chunk":4,"reserved":9,"live":0}"#,
        )
        .unwrap();
        assert_eq!(stats.free(), 0);

        let huge = ArenaStats {
            chunks: usize::MAX,
            slots_per_chunk: 2,
            reserved: 0,
            live: 0,
        };
        assert_eq!(huge.total_slots(), usize::MAX);
    }
}
