use std::fmt;

use serde::{Deserialize, Serialize};

/// Which direction a value is travelling when the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The value was read from the backend and is about to reach the caller.
    Get,
    /// The value came from the caller and is about to reach the backend.
    Set,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
