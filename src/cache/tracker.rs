//! Dependency recording during evaluation.
//!
//! A [`DependencyTracker`] is a stack of frames, one per computation in
//! progress. Every read records into the innermost frame; when a frame
//! closes its records merge into the parent, so an outer computation ends up
//! depending on everything its nested computations touched.
//!
//! A frame can also depend on the request itself: output built from the
//! requested path differs per request root and is marked with that root.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::freshness::{Probe, Signature};

/// A probed input together with its signature when it was read.
#[derive(Clone)]
pub struct DependencyRecord {
    probe: Arc<dyn Probe>,
    captured: Signature,
}

impl DependencyRecord {
    /// Capture the probe's current signature.
    pub fn capture(probe: Arc<dyn Probe>) -> Self {
        let captured = probe.signature();
        Self { probe, captured }
    }

    pub fn identity(&self) -> &str {
        self.probe.identity()
    }

    pub fn captured(&self) -> Signature {
        self.captured
    }

    /// Whether the input still has the captured signature.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.probe.signature() == self.captured
    }
}

impl fmt::Debug for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRecord")
            .field("identity", &self.identity())
            .field("captured", &self.captured)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Frame {
    records: Vec<DependencyRecord>,
    seen: FxHashSet<String>,
    request: Option<Arc<str>>,
}

impl Frame {
    /// Add a record unless the same input is already present.
    ///
    /// The first capture wins: it is the oldest view of the input.
    fn add(&mut self, record: DependencyRecord) {
        if self.seen.insert(record.identity().to_string()) {
            self.records.push(record);
        }
    }
}

/// Stack of recording frames for one render.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    frames: Vec<Frame>,
    request: Option<Arc<str>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new innermost frame.
    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Close the innermost frame, returning its records.
    ///
    /// The records are also merged into the enclosing frame.
    pub fn pop(&mut self) -> Vec<DependencyRecord> {
        self.pop_frame().0
    }

    /// Like [`pop`](Self::pop), also returning the request root the frame
    /// consulted, if any. The mark propagates to the enclosing frame.
    pub fn pop_frame(&mut self) -> (Vec<DependencyRecord>, Option<Arc<str>>) {
        let Some(frame) = self.frames.pop() else {
            return (Vec::new(), None);
        };
        if let Some(parent) = self.frames.last_mut() {
            for record in &frame.records {
                parent.add(record.clone());
            }
            if parent.request.is_none() {
                parent.request = frame.request.clone();
            }
        }
        (frame.records, frame.request)
    }

    /// Set the root of the request being rendered.
    pub fn set_request(&mut self, root: &str) {
        self.request = Some(Arc::from(root));
    }

    pub fn request(&self) -> Option<&Arc<str>> {
        self.request.as_ref()
    }

    /// Mark the innermost frame as depending on the request root.
    pub fn note_request(&mut self) {
        let request = self.request.clone();
        if let Some(frame) = self.frames.last_mut()
            && frame.request.is_none()
        {
            frame.request = request;
        }
    }

    /// Record a read of `probe` in the innermost frame.
    ///
    /// Outside any frame nothing is recorded.
    pub fn record(&mut self, probe: &Arc<dyn Probe>) {
        if let Some(frame) = self.frames.last_mut()
            && !frame.seen.contains(probe.identity())
        {
            frame.add(DependencyRecord::capture(Arc::clone(probe)));
        }
    }

    /// Add records captured earlier (a cache hit) to the innermost frame.
    pub fn absorb(&mut self, records: &[DependencyRecord]) {
        if let Some(frame) = self.frames.last_mut() {
            for record in records {
                frame.add(record.clone());
            }
        }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Anything that carries a tracker through a computation.
pub trait Tracking {
    fn tracker(&mut self) -> &mut DependencyTracker;
}

impl Tracking for DependencyTracker {
    fn tracker(&mut self) -> &mut DependencyTracker {
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Probe whose signature is a manually bumped version.
    #[derive(Debug)]
    pub struct CounterProbe {
        identity: String,
        version: AtomicU64,
    }

    impl CounterProbe {
        pub fn new(identity: &str) -> Arc<Self> {
            Arc::new(Self {
                identity: identity.to_string(),
                version: AtomicU64::new(0),
            })
        }

        pub fn bump(&self) {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Probe for CounterProbe {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn signature(&self) -> Signature {
            Signature::Version(self.version.load(Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CounterProbe;
    use super::*;

    fn probe(name: &str) -> (Arc<CounterProbe>, Arc<dyn Probe>) {
        let concrete = CounterProbe::new(name);
        let dynamic: Arc<dyn Probe> = concrete.clone();
        (concrete, dynamic)
    }

    #[test]
    fn record_outside_frame_is_ignored() {
        let (_, p) = probe("a");
        let mut tracker = DependencyTracker::new();
        tracker.record(&p);
        assert_eq!(tracker.depth(), 0);
        assert!(tracker.pop().is_empty());
    }

    #[test]
    fn nested_frames_merge_into_parent() {
        let (_, a) = probe("a");
        let (_, b) = probe("b");
        let mut tracker = DependencyTracker::new();

        tracker.push();
        tracker.record(&a);
        tracker.push();
        tracker.record(&b);
        let inner = tracker.pop();
        let outer = tracker.pop();

        assert_eq!(inner.len(), 1);
        let names: Vec<&str> = outer.iter().map(DependencyRecord::identity).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn duplicates_keep_first_capture() {
        let (concrete, a) = probe("a");
        let mut tracker = DependencyTracker::new();
        tracker.push();
        tracker.record(&a);
        concrete.bump();
        tracker.record(&a);
        let records = tracker.pop();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].captured(), Signature::Version(0));
        assert!(!records[0].is_valid());
    }

    #[test]
    fn request_mark_propagates_outward() {
        let mut tracker = DependencyTracker::new();
        tracker.set_request("/a/index.ejs");

        tracker.push();
        tracker.push();
        tracker.push();
        tracker.note_request();
        let (_, innermost) = tracker.pop_frame();
        let (_, middle) = tracker.pop_frame();
        assert_eq!(innermost.as_deref(), Some("/a/index.ejs"));
        assert_eq!(middle.as_deref(), Some("/a/index.ejs"));

        tracker.push();
        let (_, unmarked) = tracker.pop_frame();
        assert!(unmarked.is_none());
    }

    #[test]
    fn absorb_adds_to_current_frame() {
        let (_, a) = probe("a");
        let earlier = vec![DependencyRecord::capture(a)];
        let mut tracker = DependencyTracker::new();
        tracker.push();
        tracker.absorb(&earlier);
        assert_eq!(tracker.pop().len(), 1);
    }
}
