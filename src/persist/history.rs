use std::collections::BTreeMap;
use std::path::PathBuf;

use mm_client::ChannelId;
use serde::{Deserialize, Serialize};

use super::{read_json, write_json, PersistError};

/// Maximum lines remembered per channel.
pub const MAX_LINES_PER_CHANNEL: usize = 100;

/// Previously sent input lines, per channel, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputHistory {
    entries: BTreeMap<ChannelId, Vec<String>>,
}

impl InputHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `line` for `channel`, dropping the oldest past the limit.
    pub fn add(&mut self, channel: &ChannelId, line: impl Into<String>) {
        let lines = self.entries.entry(channel.clone()).or_default();
        lines.push(line.into());
        if lines.len() > MAX_LINES_PER_CHANNEL {
            let excess = lines.len() - MAX_LINES_PER_CHANNEL;
            lines.drain(..excess);
        }
    }

    /// Lines recorded for `channel`.
    pub fn lines(&self, channel: &ChannelId) -> &[String] {
        self.entries.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

/// Storage for [`InputHistory`].
pub trait HistoryStore: Send + Sync {
    /// Reads the saved history.
    fn read(&self) -> Result<InputHistory, PersistError>;

    /// Replaces the saved history.
    fn save(&self, history: &InputHistory) -> Result<(), PersistError>;
}

/// History kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    /// File name inside the state directory.
    pub const FILE_NAME: &'static str = "history.json";

    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`Self::FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir.into().join(Self::FILE_NAME))
    }
}

impl HistoryStore for FileHistoryStore {
    fn read(&self) -> Result<InputHistory, PersistError> {
        read_json(&self.path)
    }

    fn save(&self, history: &InputHistory) -> Result<(), PersistError> {
        write_json(&self.path, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_caps_lines_per_channel() {
        let mut history = InputHistory::new();
        let channel = ChannelId::from("c1");
        for i in 0..(MAX_LINES_PER_CHANNEL + 5) {
            history.add(&channel, format!("line {i}"));
        }
        let lines = history.lines(&channel);
        assert_eq!(lines.len(), MAX_LINES_PER_CHANNEL);
        assert_eq!(lines[0], "line 5", "oldest lines should be dropped first");
        assert!(history.lines(&ChannelId::from("c2")).is_empty());
    }

    #[test]
    fn file_store_round_trip_keeps_channels_apart() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = FileHistoryStore::in_dir(dir.path());
        let mut history = InputHistory::new();
        history.add(&ChannelId::from("c1"), "hello");
        history.add(&ChannelId::from("c2"), "/join dev");
        store.save(&history).expect("save should succeed");

        let loaded = store.read().expect("read should succeed");
        assert_eq!(loaded.lines(&ChannelId::from("c1")), ["hello".to_string()]);
        assert_eq!(loaded, history);
    }

    #[test]
    fn corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = FileHistoryStore::in_dir(dir.path());
        std::fs::write(dir.path().join(FileHistoryStore::FILE_NAME), "[1,2")
            .expect("failed to write file");
        assert!(matches!(store.read(), Err(PersistError::Decode { .. })));
    }
}
