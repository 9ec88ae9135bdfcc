use serde::{Deserialize, Serialize};

/// One generated input, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub index: usize,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub samples: Vec<Sample>,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub seed: Option<u64>,
    pub count: usize,
    /// Log and count failed samples instead of aborting the run.
    pub keep_going: bool,
    /// Store every sample in one zip with this name instead of separate files.
    pub archive: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            seed: None,
            count: 1,
            keep_going: false,
            archive: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub workload: String,
    pub generated: usize,
    pub failed: usize,
    /// Paths written, relative to the storage root.
    pub files: Vec<String>,
}
