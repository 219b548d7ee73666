use serde::{Deserialize, Serialize};
use std::fmt;

/// Path segments identifying a materializable asset, e.g. `["raw", "events"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub path: Vec<String>,
}

impl AssetKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a slash-separated display string (`raw/events`).
    pub fn from_display(s: &str) -> Self {
        Self::new(s.split('/').filter(|seg| !seg.is_empty()))
    }

    pub fn display_name(&self) -> String {
        self.path.join("/")
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
