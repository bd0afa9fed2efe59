/// Early-stop heuristic for incremental runs: once this many candidate
/// URLs in a row are already stored, assume the rest of the traversal is
/// old news and stop.
///
/// Republished articles can reset the streak mid-run, so a stop is a
/// heuristic, not a guarantee that every older article was seen.
#[derive(Debug)]
pub struct SyncPolicy {
    threshold: usize,
    consecutive_existing: usize,
}

impl SyncPolicy {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            consecutive_existing: 0,
        }
    }

    /// A policy that never stops; useful for full backfills.
    pub fn disabled() -> Self {
        Self::new(usize::MAX)
    }

    pub fn record_existing(&mut self) {
        self.consecutive_existing += 1;
    }

    pub fn record_new(&mut self) {
        self.consecutive_existing = 0;
    }

    pub fn should_stop(&self) -> bool {
        self.consecutive_existing >= self.threshold
    }

    pub fn consecutive_existing(&self) -> usize {
        self.consecutive_existing
    }
}
