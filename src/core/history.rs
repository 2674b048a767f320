//! Bounded history with a draft slot and scratch overlays.
//!
//! Entries run newest (index 0) to oldest. Index 0 is the draft slot for the
//! line currently being typed; navigating away from any slot records the
//! in-progress edit in that slot's `edited` overlay so up/down round trips
//! do not lose work.

use std::fs;
use std::io;
use std::io::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Default)]
struct HistoryEntry {
    original: String,
    edited: Option<String>,
}

impl HistoryEntry {
    fn value(&self) -> &str {
        self.edited.as_deref().unwrap_or(&self.original)
    }
}

#[derive(Debug)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: vec![HistoryEntry::default()],
            index: 0,
            max_size,
        }
    }

    /// Commit a line. A repeat of the most recent committed entry only clears
    /// the draft slot; anything else becomes the new entry 1 and a fresh
    /// draft slot is pushed. Navigation restarts at the draft.
    pub fn add(&mut self, line: &str) {
        if self.entries.len() >= 2 && line == self.entries[1].value() {
            self.entries[0] = HistoryEntry::default();
        } else {
            self.entries[0] = HistoryEntry {
                original: line.to_string(),
                edited: None,
            };
            self.entries.insert(0, HistoryEntry::default());
            if self.entries.len() > self.max_size + 1 {
                self.entries.pop();
            }
        }

        self.index = 0;
    }

    /// Move toward older entries, recording `current` in the slot being left.
    /// `None` means the cursor is already on the oldest entry.
    pub fn record_and_go_back(&mut self, current: &str) -> Option<String> {
        if self.index == self.entries.len() - 1 {
            return None;
        }

        self.record(current);
        self.index += 1;
        Some(self.entries[self.index].value().to_string())
    }

    /// Move toward newer entries; symmetric to [`History::record_and_go_back`].
    pub fn record_and_go_forward(&mut self, current: &str) -> Option<String> {
        if self.index == 0 {
            return None;
        }

        self.record(current);
        self.index -= 1;
        Some(self.entries[self.index].value().to_string())
    }

    /// Write committed entries (oldest first, one per line) to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        for entry in self.entries.iter().rev().take(self.entries.len() - 1) {
            file.write_all(entry.original.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Replace contents from `path`; the file's last line becomes entry 1.
    /// A missing or unreadable file leaves an empty history. The bound is
    /// relaxed upward to fit the file.
    pub fn load(&mut self, path: &Path) {
        self.entries.clear();

        if let Ok(content) = fs::read_to_string(path) {
            let mut lines: Vec<&str> = content.lines().collect();
            while lines.last() == Some(&"") {
                lines.pop();
            }
            for line in lines {
                self.entries.insert(
                    0,
                    HistoryEntry {
                        original: line.to_string(),
                        edited: None,
                    },
                );
            }
        }

        self.entries.insert(0, HistoryEntry::default());
        self.index = 0;
        if self.max_size < self.entries.len() - 1 {
            self.max_size = self.entries.len() - 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn committed(&self) -> Vec<&str> {
        self.entries.iter().skip(1).map(|e| e.original.as_str()).collect()
    }

    fn record(&mut self, current: &str) {
        if self.entries[self.index].original != current {
            self.entries[self.index].edited = Some(current.to_string());
        } else {
            self.entries[self.index].edited = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::History;

    #[test]
    fn add_prepends_and_keeps_a_draft_slot() {
        let mut history = History::new(10);
        history.add("one");
        history.add("two");
        assert_eq!(history.committed(), vec!["two", "one"]);
    }

    #[test]
    fn repeated_line_does_not_grow_history() {
        let mut history = History::new(10);
        history.add("same");
        history.add("same");
        assert_eq!(history.committed(), vec!["same"]);
    }

    #[test]
    fn oldest_entry_is_dropped_past_the_bound() {
        let mut history = History::new(2);
        history.add("a");
        history.add("b");
        history.add("c");
        assert_eq!(history.committed(), vec!["c", "b"]);
    }

    #[test]
    fn navigation_stops_at_both_ends() {
        let mut history = History::new(10);
        history.add("old");
        history.add("new");

        assert_eq!(history.record_and_go_back("").as_deref(), Some("new"));
        assert_eq!(history.record_and_go_back("new").as_deref(), Some("old"));
        assert_eq!(history.record_and_go_back("old"), None);

        assert_eq!(history.record_and_go_forward("old").as_deref(), Some("new"));
        assert_eq!(history.record_and_go_forward("new").as_deref(), Some(""));
        assert_eq!(history.record_and_go_forward(""), None);
    }

    #[test]
    fn scratch_edits_survive_a_round_trip() {
        let mut history = History::new(10);
        history.add("committed");

        // Start typing a draft, go up, come back down: the draft is intact.
        assert_eq!(
            history.record_and_go_back("draft in progress").as_deref(),
            Some("committed")
        );
        assert_eq!(
            history.record_and_go_forward("committed").as_deref(),
            Some("draft in progress")
        );

        // Already on the oldest entry: no move.
        assert_eq!(
            history.record_and_go_back("draft in progress").as_deref(),
            Some("committed")
        );
        assert!(history.record_and_go_back("committed edit").is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.txt");

        let mut history = History::new(10);
        history.add("first");
        history.add("second");
        history.save(&path).expect("save history");

        let content = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(content, "first\nsecond\n");

        let mut loaded = History::new(10);
        loaded.load(&path);
        assert_eq!(loaded.committed(), vec!["second", "first"]);
    }

    #[test]
    fn load_relaxes_the_bound_to_fit_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.txt");
        std::fs::write(&path, "a\nb\nc\n").expect("write file");

        let mut history = History::new(1);
        history.load(&path);
        assert_eq!(history.committed(), vec!["c", "b", "a"]);

        // The relaxed bound is 3, so a fourth commit drops the oldest.
        history.add("d");
        assert_eq!(history.committed(), vec!["d", "c", "b"]);
    }

    #[test]
    fn load_of_a_missing_file_yields_an_empty_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut history = History::new(5);
        history.add("stale");
        history.load(&dir.path().join("absent.txt"));
        assert!(history.committed().is_empty());
        assert_eq!(history.record_and_go_back(""), None);
    }
}
