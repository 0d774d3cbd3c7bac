// Holds the most recent pipeline result. Results tagged with an older
// sequence number than the one already held are discarded, never merged.

#[derive(Debug, Clone)]
pub struct LatestSnapshot<T> {
    seq: Option<u64>,
    value: Option<T>,
    discarded: u64,
}

impl<T> Default for LatestSnapshot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSnapshot<T> {
    pub fn new() -> Self {
        Self { seq: None, value: None, discarded: 0 }
    }

    // Replace the held value if `seq` is newer. Returns false for stale input.
    pub fn apply_snapshot(&mut self, seq: u64, value: T) -> bool {
        if matches!(self.seq, Some(held) if seq <= held) {
            self.discarded += 1;
            return false;
        }
        self.seq = Some(seq);
        self.value = Some(value);
        true
    }

    pub fn latest(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn seq(&self) -> Option<u64> {
        self.seq
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
