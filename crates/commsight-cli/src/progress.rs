//! Per-record progress on stderr

use std::io::{self, Write};

/// Progress reporter for commands that walk a records file
pub struct ProgressReporter {
    total: usize,
    processed: usize,
    failed: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            failed: 0,
        }
    }

    pub fn start(&self, id: &str) {
        eprint!("\r[{}/{}] {:<50}", self.processed + 1, self.total, id);
        io::stderr().flush().ok();
    }

    pub fn succeeded(&mut self) {
        self.processed += 1;
    }

    pub fn failed(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    pub fn finish(&self) {
        eprintln!(
            "\rDone ({}/{}, {} failed){:<30}",
            self.processed - self.failed,
            self.total,
            self.failed,
            ""
        );
    }
}
