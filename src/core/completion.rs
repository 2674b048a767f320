//! Round-robin completion cursor.

/// Holds the most recent candidate list and cycles through it.
///
/// The list is anchored to the line as it looked when Tab was first pressed:
/// that snapshot is appended as the final candidate, so cycling all the way
/// around restores what the user typed.
#[derive(Default)]
pub struct Completion {
    callback: Option<Box<dyn FnMut(&str) -> Vec<String> + Send>>,
    candidates: Option<Vec<String>>,
    index: usize,
}

impl Completion {
    pub fn set_callback(&mut self, callback: Box<dyn FnMut(&str) -> Vec<String> + Send>) {
        self.callback = Some(callback);
    }

    /// Advance to the next candidate, building the list from the callback on
    /// the first call after a reset. `None` when there is no callback or it
    /// produced nothing.
    pub fn next(&mut self, current: &str) -> Option<String> {
        if self.candidates.is_none() && !self.rebuild(current) {
            return None;
        }

        let candidates = self.candidates.as_ref()?;
        self.index = (self.index + 1) % candidates.len();
        Some(candidates[self.index].clone())
    }

    /// Drop the candidate list. Called on any buffer mutation the cursor did
    /// not produce itself, so the next Tab queries the callback again.
    pub fn reset(&mut self) {
        self.candidates = None;
    }

    fn rebuild(&mut self, current: &str) -> bool {
        let callback = match self.callback.as_mut() {
            Some(callback) => callback,
            None => return false,
        };

        let mut candidates = callback(current);
        if candidates.is_empty() {
            return false;
        }

        candidates.push(current.to_string());
        self.index = candidates.len() - 1;
        self.candidates = Some(candidates);
        true
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("has_callback", &self.callback.is_some())
            .field("candidates", &self.candidates)
            .field("index", &self.index)
            .finish()
    }
}
