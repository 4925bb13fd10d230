use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Rolling buffer of raw command I/O lines, shared between the command
/// runner, the repository cache and whoever renders diagnostics.
///
/// Handles are cheap to clone; all of them append into the same buffer.
/// When the buffer is full the oldest line is dropped. Appends from
/// different tasks interleave in arrival order, nothing stronger.
#[derive(Debug, Clone)]
pub struct CommandLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl CommandLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(256)))),
            capacity,
        }
    }

    /// Append one line, evicting the oldest entry once over capacity.
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Copy of the buffer contents, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMMAND_LOG_CAPACITY)
    }
}
