//! Progress indicators for release runs
//!
//! Uses `linya`, whose bars are safe to drive from many pipeline threads at once.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Multi-bar progress for parallel pipelines.
/// Hidden instances hand out no bars and draw nothing (JSON output, tests).
#[derive(Clone)]
pub struct MultiProgress {
  progress: Option<Arc<Mutex<Progress>>>,
}

impl MultiProgress {
  /// Create a new multi-progress container drawing to stderr
  pub fn new() -> Self {
    Self {
      progress: Some(Arc::new(Mutex::new(Progress::new()))),
    }
  }

  /// Container that never draws
  pub fn hidden() -> Self {
    Self { progress: None }
  }

  /// Add a new bar with a label and total
  pub fn add_bar(&self, total: usize, label: impl Into<String>) -> Option<Bar> {
    let progress = self.progress.as_ref()?;
    let mut progress = progress.lock().ok()?;
    Some(progress.bar(total, label.into()))
  }

  /// Increment a bar by one step
  pub fn inc(&self, bar: Option<&Bar>) {
    self.with(bar, |progress, bar| progress.inc_and_draw(bar, 1));
  }

  /// Move a bar to `pos` (used to close out a pipeline that stopped early)
  pub fn set(&self, bar: Option<&Bar>, pos: usize) {
    self.with(bar, |progress, bar| progress.set_and_draw(bar, pos));
  }

  fn with(&self, bar: Option<&Bar>, f: impl FnOnce(&mut Progress, &Bar)) {
    let (Some(progress), Some(bar)) = (self.progress.as_ref(), bar) else {
      return;
    };
    // A poisoned lock only means another bar panicked mid-draw
    let mut progress = match progress.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut progress, bar);
  }
}

impl Default for MultiProgress {
  fn default() -> Self {
    Self::new()
  }
}
