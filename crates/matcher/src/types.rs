use diff::DiffEvent;
use serde::{Deserialize, Serialize};

/// A keyword found in one difference.
///
/// `keyword` is the subscriber's original phrase, `text` the exact run that
/// satisfied it and `snippet` the same run widened with surrounding source
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Match {
    pub event: DiffEvent,
    pub keyword: String,
    pub text: String,
    pub snippet: String,
}

/// Event categories a subscriber does not want to hear about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub ignore_added: bool,
    #[serde(default)]
    pub ignore_removed: bool,
}

impl EventFilter {
    pub fn new(ignore_added: bool, ignore_removed: bool) -> Self {
        Self {
            ignore_added,
            ignore_removed,
        }
    }

    pub fn admits(self, event: DiffEvent) -> bool {
        match event {
            DiffEvent::Inserted => !self.ignore_added,
            DiffEvent::Deleted => !self.ignore_removed,
        }
    }
}
