use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_MUTATION: NonZeroUsize = NonZeroUsize::new(50).unwrap();
const DEFAULT_FETCH: NonZeroUsize = NonZeroUsize::new(500).unwrap();
const DEFAULT_EXPUNGE_INTERVAL: NonZeroUsize = NonZeroUsize::new(50).unwrap();

/// Batch sizes for the mutation and analysis loops.
///
/// Small mutation batches keep COPY and STORE command lines below the limits of strict servers;
/// fetch batches are larger because they only read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchLimits {
    /// UIDs resolved, copied and flagged per round.
    mutation: NonZeroUsize,
    /// Messages fetched per round while aggregating senders.
    fetch: NonZeroUsize,
    /// Messages processed between two incremental expunges.
    expunge_interval: NonZeroUsize,
}

impl BatchLimits {
    pub fn new(
        mutation: NonZeroUsize,
        fetch: NonZeroUsize,
        expunge_interval: NonZeroUsize,
    ) -> Self {
        Self {
            mutation,
            fetch,
            expunge_interval,
        }
    }

    pub fn mutation(&self) -> NonZeroUsize {
        self.mutation
    }

    pub fn fetch(&self) -> NonZeroUsize {
        self.fetch
    }

    pub fn expunge_interval(&self) -> NonZeroUsize {
        self.expunge_interval
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MUTATION, DEFAULT_FETCH, DEFAULT_EXPUNGE_INTERVAL)
    }
}

/// Decides when an incremental expunge is due.
#[derive(Debug)]
pub(crate) struct ExpungeSchedule {
    interval: usize,
    since_last: usize,
}

impl ExpungeSchedule {
    pub(crate) fn new(interval: NonZeroUsize) -> Self {
        Self {
            interval: interval.get(),
            since_last: 0,
        }
    }

    /// Records `processed` flagged messages and tells whether an expunge is due now.
    pub(crate) fn record(&mut self, processed: usize) -> bool {
        self.since_last += processed;
        if self.since_last >= self.interval {
            self.since_last = 0;
            true
        } else {
            false
        }
    }
}
