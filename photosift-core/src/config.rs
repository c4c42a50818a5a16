//! Engine configuration

use photosift_common::config::EngineSettings;

/// Carousel engine configuration
///
/// Passed explicitly to the engine constructor; there is no process-wide
/// configuration state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Radius (in items) around the cursor kept decoded
    pub preload_range: usize,

    /// Maximum restorable deletions (None = unbounded)
    pub undo_capacity: Option<usize>,

    /// Score items in the same pass that decodes them
    pub auto_score: bool,

    /// Run the background worker; when false all work happens inline
    pub background: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            preload_range: settings.preload_range,
            undo_capacity: settings.undo_capacity,
            auto_score: settings.auto_score,
            background: settings.background,
        }
    }
}
