//! The in-memory sample history for one acquisition session.
//!
//! Append-only and time-ordered: the acquisition loop is the only writer,
//! everything else (stats, presentation, export) reads point-in-time
//! snapshots. Capacity is bounded; past the cap the oldest samples are
//! evicted from the front so memory stays flat on long runs.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::sample::Sample;

/// Time-ordered sample sequence with a capacity cap.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    cap: usize,
}

impl SampleBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(cap.min(4096)),
            cap: cap.max(1),
        }
    }

    /// Append a sample, keeping timestamps non-decreasing and evicting the
    /// oldest entry once the cap is reached.
    pub fn push(&mut self, mut sample: Sample) {
        if let Some(last) = self.samples.back() {
            // Timestamps never run backwards within a session
            if sample.elapsed_secs < last.elapsed_secs {
                sample.elapsed_secs = last.elapsed_secs;
            }
        }
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Owned copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

/// Shared handle over a [`SampleBuffer`].
///
/// The lock is the explicit read/write ordering guard between the single
/// writer and concurrent snapshot readers; writes hold it only for one
/// append, reads only for one copy.
#[derive(Clone, Debug)]
pub struct SharedBuffer {
    inner: Arc<RwLock<SampleBuffer>>,
}

impl SharedBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SampleBuffer::new(cap))),
        }
    }

    pub fn push(&self, sample: Sample) {
        self.write_guard().push(sample);
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.read_guard().snapshot()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, SampleBuffer> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, SampleBuffer> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn appends_in_order() {
        let mut buf = SampleBuffer::new(10);
        buf.push(Sample::new(0.0, 1.0));
        buf.push(Sample::new(1.0, 2.0));
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].value, 1.0);
        assert_eq!(snap[1].value, 2.0);
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut buf = SampleBuffer::new(3);
        for i in 0..5 {
            buf.push(Sample::new(i as f64, i as f64 * 10.0));
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].value, 20.0);
        assert_eq!(snap[2].value, 40.0);
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut buf = SampleBuffer::new(10);
        buf.push(Sample::new(5.0, 1.0));
        buf.push(Sample::new(3.0, 2.0));
        let snap = buf.snapshot();
        assert!(snap[1].elapsed_secs >= snap[0].elapsed_secs);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let shared = SharedBuffer::new(10);
        shared.push(Sample::new(0.0, 1.0));
        let snap = shared.snapshot();
        shared.push(Sample::new(1.0, 2.0));
        assert_eq!(snap.len(), 1);
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn concurrent_writer_and_snapshot_readers() {
        let shared = SharedBuffer::new(10_000);

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..1_000 {
                    shared.push(Sample::new(i as f64 * 0.001, i as f64));
                }
            })
        };

        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let snap = shared.snapshot();
                    // Every observed snapshot is internally ordered
                    for pair in snap.windows(2) {
                        assert!(pair[1].elapsed_secs >= pair[0].elapsed_secs);
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(shared.len(), 1_000);
    }
}
