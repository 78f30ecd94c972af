//! Recording mock of the recording gateway.
//!
//! Rows handed to [`MockRecordingGateway::with_recordings`] are returned by
//! `get_recordings` when their ID is among the requested meeting IDs (an
//! empty request returns every row).

use meeting_coordinator::gateway::RecordingGateway;
use meeting_coordinator::recording::Recording;
use std::sync::{Arc, Mutex};

/// One call made on the recording gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingCall {
    StartIngest(String),
    GetRecordings(Vec<String>),
    ExistsAnyRecording(Vec<String>),
    Publish { recording_id: String, publish: bool },
    Delete(String),
}

/// Mock recording gateway. Clones share the same journal.
#[derive(Debug, Clone, Default)]
pub struct MockRecordingGateway {
    inner: Arc<Mutex<MockRecordingInner>>,
}

#[derive(Debug, Default)]
struct MockRecordingInner {
    calls: Vec<RecordingCall>,
    rows: Vec<Recording>,
    panic_on_ingest: bool,
}

impl MockRecordingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub the raw rows the store returns.
    #[must_use]
    pub fn with_recordings(self, rows: Vec<Recording>) -> Self {
        self.inner.lock().unwrap().rows = rows;
        self
    }

    /// Make `start_ingest_and_processing` panic (after journaling the call).
    #[must_use]
    pub fn panic_on_ingest(self) -> Self {
        self.inner.lock().unwrap().panic_on_ingest = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordingCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Meeting IDs handed to ingest, in order.
    pub fn ingested(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordingCall::StartIngest(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn matching_rows(&self, meeting_ids: &[String]) -> Vec<Recording> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| meeting_ids.is_empty() || meeting_ids.contains(&r.id))
            .cloned()
            .collect()
    }

    fn journal(&self, call: RecordingCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl RecordingGateway for MockRecordingGateway {
    fn start_ingest_and_processing(&self, meeting_id: &str) {
        let should_panic = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .calls
                .push(RecordingCall::StartIngest(meeting_id.to_string()));
            inner.panic_on_ingest
        };
        if should_panic {
            panic!("MockRecordingGateway: configured panic in start_ingest_and_processing");
        }
    }

    fn get_recordings(&self, meeting_ids: &[String]) -> Vec<Recording> {
        self.journal(RecordingCall::GetRecordings(meeting_ids.to_vec()));
        self.matching_rows(meeting_ids)
    }

    fn exists_any_recording(&self, meeting_ids: &[String]) -> bool {
        self.journal(RecordingCall::ExistsAnyRecording(meeting_ids.to_vec()));
        !self.matching_rows(meeting_ids).is_empty()
    }

    fn publish(&self, recording_id: &str, publish: bool) {
        self.journal(RecordingCall::Publish {
            recording_id: recording_id.to_string(),
            publish,
        });
    }

    fn delete(&self, recording_id: &str) {
        self.journal(RecordingCall::Delete(recording_id.to_string()));
    }
}
