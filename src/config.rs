use std::path::PathBuf;

use crate::knowledge_base::DEFAULT_MAX_DEPTH;

pub const DEFAULT_RESULT_PATH: &str = "output.txt";

/// Settings for one interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File overwritten with the answer to every `ASK`.
    pub result_path: PathBuf,
    /// How many rule expansions deep a single proof may go before the branch is given up.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            result_path: PathBuf::from(DEFAULT_RESULT_PATH),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn with_result_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_path = path.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
