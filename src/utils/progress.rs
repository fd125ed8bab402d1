use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that reports which pipeline stage a run is in.
///
/// Hidden trackers do nothing, so callers never branch on whether output is
/// interactive.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    doc_name: String,
}

impl ProgressTracker {
    pub fn new(doc_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            progress_bar: Some(pb),
            doc_name: doc_name.to_string(),
        }
    }

    pub fn hidden(doc_name: &str) -> Self {
        Self {
            progress_bar: None,
            doc_name: doc_name.to_string(),
        }
    }

    pub fn stage(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("[{}] {}", self.doc_name, message));
        }
    }

    pub fn finish(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("[{}] {}", self.doc_name, message));
        }
    }

    pub fn abandon(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.abandon_with_message(format!("[{}] {}", self.doc_name, message));
        }
    }
}
