use std::sync::{Arc, Mutex};

use procharness::announcer::{Announcer, AnnouncerEvent};

/// An announcer that records every event, in order.
///
/// Clones share the same record, so a test can keep one copy and hand the
/// other to the session.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnnouncer {
    events: Arc<Mutex<Vec<AnnouncerEvent>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnnouncerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Commands announced so far.
    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AnnouncerEvent::Command(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, event: &AnnouncerEvent) {
        let mut guard = self.events.lock().unwrap();
        guard.push(event.clone());
    }
}
