//! Recording mock of the messaging gateway.
//!
//! Every call is appended to a shared journal so tests can assert on the
//! exact sequence the event processor produced. Subscriptions are kept in
//! memory so store/list/remove behave like a real store.
//!
//! # Example
//!
//! ```rust,ignore
//! use coordinator_test_utils::MockMessagingGateway;
//!
//! let messaging = MockMessagingGateway::new().panic_on("destroy_meeting");
//! // hand `Arc::new(messaging.clone())` to the coordinator, then:
//! assert_eq!(messaging.destroyed(), vec!["meeting-123".to_string()]);
//! ```

use meeting_coordinator::gateway::MessagingGateway;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made on the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingCall {
    CreateMeeting {
        meeting_id: String,
        name: String,
        record: bool,
        voice_bridge: String,
        duration: u64,
    },
    EndMeeting(String),
    DestroyMeeting(String),
    RecordMeetingInfo {
        meeting_id: String,
        metadata: HashMap<String, String>,
    },
    StoreSubscription {
        meeting_id: String,
        event: String,
        callback_url: String,
    },
    RemoveSubscription {
        meeting_id: String,
        subscription_id: String,
    },
    ListSubscriptions(String),
    Send {
        channel: String,
        message: String,
    },
    SendPolls {
        meeting_id: String,
        title: String,
        answers: Vec<String>,
    },
}

/// Mock messaging gateway. Clones share the same journal.
#[derive(Debug, Clone, Default)]
pub struct MockMessagingGateway {
    inner: Arc<Mutex<MockMessagingInner>>,
}

#[derive(Debug, Default)]
struct MockMessagingInner {
    calls: Vec<MessagingCall>,
    /// Subscriptions per meeting, each with an `id` entry
    subscriptions: HashMap<String, Vec<HashMap<String, String>>>,
    next_subscription: u64,
    /// Method names that panic after being journaled
    panic_on: HashSet<&'static str>,
    /// Method names that block the calling thread before returning
    delay_on: HashMap<&'static str, Duration>,
}

impl MockMessagingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `method` panic every time it is called (after journaling the call).
    #[must_use]
    pub fn panic_on(self, method: &'static str) -> Self {
        self.inner.lock().unwrap().panic_on.insert(method);
        self
    }

    /// Stop panicking on `method`.
    pub fn clear_panic(&self, method: &'static str) {
        self.inner.lock().unwrap().panic_on.remove(method);
    }

    /// Make `method` block the calling thread for `delay` on every call.
    ///
    /// The gateway is synchronous, so this stalls the event processor the way
    /// a slow collaborator would. Use a multi-threaded runtime.
    #[must_use]
    pub fn delay_on(self, method: &'static str, delay: Duration) -> Self {
        self.inner.lock().unwrap().delay_on.insert(method, delay);
        self
    }

    /// Stop delaying `method`.
    pub fn clear_delay(&self, method: &'static str) {
        self.inner.lock().unwrap().delay_on.remove(method);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<MessagingCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Meeting IDs passed to `create_meeting`, in order.
    pub fn created(&self) -> Vec<String> {
        self.filter(|c| match c {
            MessagingCall::CreateMeeting { meeting_id, .. } => Some(meeting_id.clone()),
            _ => None,
        })
    }

    /// Meeting IDs passed to `end_meeting`, in order.
    pub fn ended(&self) -> Vec<String> {
        self.filter(|c| match c {
            MessagingCall::EndMeeting(id) => Some(id.clone()),
            _ => None,
        })
    }

    /// Meeting IDs passed to `destroy_meeting`, in order.
    pub fn destroyed(&self) -> Vec<String> {
        self.filter(|c| match c {
            MessagingCall::DestroyMeeting(id) => Some(id.clone()),
            _ => None,
        })
    }

    /// Metadata passed to `record_meeting_info` for a meeting, if any.
    pub fn recorded_info(&self, meeting_id: &str) -> Option<HashMap<String, String>> {
        self.filter(|c| match c {
            MessagingCall::RecordMeetingInfo {
                meeting_id: id,
                metadata,
            } if id == meeting_id => Some(metadata.clone()),
            _ => None,
        })
        .pop()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    fn filter<T>(&self, f: impl Fn(&MessagingCall) -> Option<T>) -> Vec<T> {
        self.inner.lock().unwrap().calls.iter().filter_map(f).collect()
    }

    /// Journal a call; delay or panic afterwards if configured, with the lock
    /// released.
    fn journal(&self, method: &'static str, call: MessagingCall) {
        let (delay, should_panic) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(call);
            (
                inner.delay_on.get(method).copied(),
                inner.panic_on.contains(method),
            )
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if should_panic {
            panic!("MockMessagingGateway: configured panic in {method}");
        }
    }
}

impl MessagingGateway for MockMessagingGateway {
    fn create_meeting(
        &self,
        meeting_id: &str,
        name: &str,
        record: bool,
        voice_bridge: &str,
        duration: u64,
    ) {
        self.journal(
            "create_meeting",
            MessagingCall::CreateMeeting {
                meeting_id: meeting_id.to_string(),
                name: name.to_string(),
                record,
                voice_bridge: voice_bridge.to_string(),
                duration,
            },
        );
    }

    fn end_meeting(&self, meeting_id: &str) {
        self.journal("end_meeting", MessagingCall::EndMeeting(meeting_id.to_string()));
    }

    fn destroy_meeting(&self, meeting_id: &str) {
        self.journal(
            "destroy_meeting",
            MessagingCall::DestroyMeeting(meeting_id.to_string()),
        );
    }

    fn record_meeting_info(&self, meeting_id: &str, metadata: &HashMap<String, String>) {
        self.journal(
            "record_meeting_info",
            MessagingCall::RecordMeetingInfo {
                meeting_id: meeting_id.to_string(),
                metadata: metadata.clone(),
            },
        );
    }

    fn store_subscription(&self, meeting_id: &str, event: &str, callback_url: &str) -> String {
        let subscription_id = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_subscription += 1;
            let subscription_id = format!("sub-{}", inner.next_subscription);
            inner
                .subscriptions
                .entry(meeting_id.to_string())
                .or_default()
                .push(HashMap::from([
                    ("id".to_string(), subscription_id.clone()),
                    ("event".to_string(), event.to_string()),
                    ("callbackUrl".to_string(), callback_url.to_string()),
                ]));
            subscription_id
        };
        self.journal(
            "store_subscription",
            MessagingCall::StoreSubscription {
                meeting_id: meeting_id.to_string(),
                event: event.to_string(),
                callback_url: callback_url.to_string(),
            },
        );
        subscription_id
    }

    fn remove_subscription(&self, meeting_id: &str, subscription_id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            match inner.subscriptions.get_mut(meeting_id) {
                Some(subs) => {
                    let before = subs.len();
                    subs.retain(|s| s.get("id").map(String::as_str) != Some(subscription_id));
                    subs.len() != before
                }
                None => false,
            }
        };
        self.journal(
            "remove_subscription",
            MessagingCall::RemoveSubscription {
                meeting_id: meeting_id.to_string(),
                subscription_id: subscription_id.to_string(),
            },
        );
        removed
    }

    fn list_subscriptions(&self, meeting_id: &str) -> Vec<HashMap<String, String>> {
        let subscriptions = self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .get(meeting_id)
            .cloned()
            .unwrap_or_default();
        self.journal(
            "list_subscriptions",
            MessagingCall::ListSubscriptions(meeting_id.to_string()),
        );
        subscriptions
    }

    fn send(&self, channel: &str, message: &str) {
        self.journal(
            "send",
            MessagingCall::Send {
                channel: channel.to_string(),
                message: message.to_string(),
            },
        );
    }

    fn send_polls(
        &self,
        meeting_id: &str,
        title: &str,
        _question: &str,
        _question_type: &str,
        answers: &[String],
    ) {
        self.journal(
            "send_polls",
            MessagingCall::SendPolls {
                meeting_id: meeting_id.to_string(),
                title: title.to_string(),
                answers: answers.to_vec(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_and_subscriptions() {
        let mock = MockMessagingGateway::new();
        mock.create_meeting("m-1", "Standup", false, "70001", 0);
        let sid = mock.store_subscription("m-1", "meeting-ended", "https://hooks/x");

        assert_eq!(mock.created(), vec!["m-1".to_string()]);
        assert_eq!(mock.list_subscriptions("m-1").len(), 1);
        assert!(mock.remove_subscription("m-1", &sid));
        assert!(!mock.remove_subscription("m-1", &sid));
        assert!(mock.list_subscriptions("m-1").is_empty());
    }

    #[test]
    fn test_configured_panic_still_journals() {
        let mock = MockMessagingGateway::new().panic_on("destroy_meeting");
        let result = std::panic::catch_unwind(|| mock.destroy_meeting("m-1"));
        assert!(result.is_err());
        assert_eq!(mock.destroyed(), vec!["m-1".to_string()]);

        // Lock is not poisoned
        mock.clear_panic("destroy_meeting");
        mock.destroy_meeting("m-2");
        assert_eq!(mock.destroyed().len(), 2);
    }

    #[test]
    fn test_configured_delay_blocks_only_that_method() {
        let mock = MockMessagingGateway::new().delay_on("send", Duration::from_millis(50));

        let start = std::time::Instant::now();
        mock.send("chan", "hello");
        assert!(start.elapsed() >= Duration::from_millis(50));

        let start = std::time::Instant::now();
        mock.end_meeting("m-1");
        mock.clear_delay("send");
        mock.send("chan", "again");
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(mock.calls().len(), 3);
    }
}
