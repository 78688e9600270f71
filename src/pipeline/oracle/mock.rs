//! Test doubles for the oracle layer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{Oracle, OracleError, Sleeper};

/// A single prompt the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
    pub require_json: bool,
}

/// Mock oracle that replays a scripted queue of replies.
///
/// When the queue is empty it falls back to `default_reply` (if set) or
/// reports an `Other` error.
pub struct MockOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    default_reply: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that answers every call with the same text.
    pub fn always(reply: &str) -> Self {
        Self {
            default_reply: Some(reply.to_string()),
            ..Self::new()
        }
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn then_fail(self, err: OracleError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Oracle for MockOracle {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            temperature,
            require_json,
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| OracleError::Other("mock oracle has no scripted reply".into())),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Sleeper that records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_default() {
        let oracle = MockOracle::always("fallback")
            .then_reply("first")
            .then_fail(OracleError::RateLimited("429".into()));

        assert_eq!(oracle.generate("a", 0.0, true).unwrap(), "first");
        assert!(oracle.generate("b", 0.0, true).is_err());
        assert_eq!(oracle.generate("c", 0.5, false).unwrap(), "fallback");
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(oracle.calls()[2].temperature, 0.5);
    }

    #[test]
    fn empty_script_without_default_errors() {
        let oracle = MockOracle::new();
        let err = oracle.generate("a", 0.0, true).unwrap_err();
        assert!(matches!(err, OracleError::Other(_)));
    }
}
