use std::fmt::{self, Debug, Formatter};

use crate::util::Worker;

/// A background sweep started with [`Pool::start_recycler`](crate::Pool::start_recycler).
///
/// Each interval the sweep drains the idle resources, closes any that exceed
/// the pool's recycling thresholds and returns them all to the pool. The
/// sweep ends when this handle is stopped or dropped, or when the pool itself
/// is dropped.
pub struct Recycler {
    worker: Worker,
}

impl Recycler {
    pub(crate) fn new(worker: Worker) -> Self {
        Self { worker }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Stop the sweep, waiting for one in progress to complete.
    pub fn stop(self) {
        self.worker.stop()
    }
}

impl Debug for Recycler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recycler")
            .field("running", &self.is_running())
            .finish()
    }
}
