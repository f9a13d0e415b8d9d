//! In-process fake transport for exercising wires without a network.
//!
//! `ScriptedTransport` plays back a queue of canned outcomes, one per call,
//! and records every request it receives so tests can assert on what actually
//! reached the "origin".

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::WireError;
use crate::http::{HttpRequest, HttpResponse};
use crate::wire::Transport;

struct Step {
    outcome: Result<HttpResponse, WireError>,
    remaining: usize,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    received: Vec<HttpRequest>,
}

/// A `Transport` that answers from a script and records what it was sent.
///
/// Once the script runs out every call fails with `WireError::Transport`.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response.
    pub fn answer(self, response: HttpResponse) -> Self {
        self.push(Ok(response), 1)
    }

    /// Queues the same response for the next `times` calls.
    pub fn answer_times(self, response: HttpResponse, times: usize) -> Self {
        self.push(Ok(response), times)
    }

    /// Queues one failure.
    pub fn fail(self, error: WireError) -> Self {
        self.push(Err(error), 1)
    }

    fn push(self, outcome: Result<HttpResponse, WireError>, times: usize) -> Self {
        if times > 0 {
            self.lock().steps.push_back(Step {
                outcome,
                remaining: times,
            });
        }
        self
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().received.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().received.len()
    }

    /// Number of scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().steps.iter().map(|s| s.remaining).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        let mut script = self.lock();
        script.received.push(request.clone());

        let Some(step) = script.steps.front_mut() else {
            return Err(WireError::Transport("no more scripted answers".to_string()));
        };
        step.remaining -= 1;
        let outcome = step.outcome.clone();
        if step.remaining == 0 {
            script.steps.pop_front();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_back_in_order_and_records() {
        let transport = ScriptedTransport::new()
            .answer(HttpResponse::new(200).with_body("first"))
            .answer_times(HttpResponse::new(304), 2)
            .fail(WireError::Transport("gone".into()));

        let request = HttpRequest::get("http://localhost/r");
        assert_eq!(transport.send(&request).unwrap().body_text(), "first");
        assert_eq!(transport.send(&request).unwrap().status(), 304);
        assert_eq!(transport.send(&request).unwrap().status(), 304);
        assert_eq!(
            transport.send(&request).unwrap_err(),
            WireError::Transport("gone".into())
        );
        assert_eq!(transport.request_count(), 4);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn exhausted_script_is_a_transport_error() {
        let transport = ScriptedTransport::new();
        let err = transport.send(&HttpRequest::get("http://localhost/")).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn zero_repeats_are_ignored() {
        let transport = ScriptedTransport::new().answer_times(HttpResponse::new(200), 0);
        assert_eq!(transport.remaining(), 0);
    }
}
