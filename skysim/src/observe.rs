//! Observation sink implementations.
//!
//! [`MemorySink`] records into a shared buffer for assertions and
//! post-run inspection; [`PrintSink`] dumps events to stderr as they
//! occur. Both return promptly — the core never waits on a sink.

use std::sync::{Arc, Mutex};

use skymesh::observe::{ObservationSink, WorldSnapshot};
use skymesh::time::Timestamp;
use skymesh::types::NodeId;

/// Everything a [`MemorySink`] has recorded.
#[derive(Debug, Default)]
pub struct Recorded {
    /// Delivered path traces with their delivery times.
    pub paths: Vec<(Vec<NodeId>, Timestamp)>,
    /// `(node, neighbor, added)` topology events.
    pub neighbor_events: Vec<(NodeId, NodeId, bool)>,
    /// World snapshots in emission order.
    pub snapshots: Vec<WorldSnapshot>,
}

/// Sink that collects observations into a shared buffer.
pub struct MemorySink {
    records: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new(records: Arc<Mutex<Recorded>>) -> Self {
        Self { records }
    }
}

impl ObservationSink for MemorySink {
    fn on_path(&mut self, path: &[NodeId], time: Timestamp) {
        self.records
            .lock()
            .unwrap()
            .paths
            .push((path.to_vec(), time));
    }

    fn on_neighbor_change(&mut self, node: NodeId, neighbor: NodeId, added: bool) {
        self.records
            .lock()
            .unwrap()
            .neighbor_events
            .push((node, neighbor, added));
    }

    fn on_snapshot(&mut self, snapshot: &WorldSnapshot) {
        self.records.lock().unwrap().snapshots.push(snapshot.clone());
    }
}

/// Sink that prints observations to stderr as they occur.
#[derive(Debug, Default)]
pub struct PrintSink;

impl ObservationSink for PrintSink {
    fn on_path(&mut self, path: &[NodeId], time: Timestamp) {
        eprintln!("[{:>9.3}s] delivered via {:?}", time.as_secs_f64(), path);
    }

    fn on_neighbor_change(&mut self, node: NodeId, neighbor: NodeId, added: bool) {
        let verb = if added { "gained" } else { "lost" };
        eprintln!("node {node} {verb} neighbor {neighbor}");
    }

    fn on_snapshot(&mut self, snapshot: &WorldSnapshot) {
        eprintln!(
            "[{:>9.3}s] snapshot of {} nodes",
            snapshot.time.as_secs_f64(),
            snapshot.positions.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records() {
        let records = Arc::new(Mutex::new(Recorded::default()));
        let mut sink = MemorySink::new(records.clone());

        sink.on_path(&[0, 1, 2], Timestamp::from_secs(3));
        sink.on_neighbor_change(0, 1, true);
        sink.on_neighbor_change(0, 1, false);

        let recorded = records.lock().unwrap();
        assert_eq!(recorded.paths, vec![(vec![0, 1, 2], Timestamp::from_secs(3))]);
        assert_eq!(
            recorded.neighbor_events,
            vec![(0, 1, true), (0, 1, false)]
        );
    }
}
