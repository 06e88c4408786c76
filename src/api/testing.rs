// src/api/testing.rs

//! Deterministic stand-ins for the network and the clock, for unit tests.

use super::retry::{Clock, Sleeper};
use super::transport::{HttpResponse, HttpTransport};
use crate::errors::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Scripted {
    Reply {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    Fail,
}

/// Replays canned responses per exact URL and records every request.
///
/// The last scripted reply for a URL is repeated once the queue is drained.
/// Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<(String, HeaderMap)>>,
}

impl ScriptedTransport {
    pub fn reply(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.reply_with_headers(url, status, &[], body)
    }

    pub fn reply_with_headers(
        &self,
        url: &str,
        status: u16,
        headers: &[(&str, &str)],
        body: impl Into<Vec<u8>>,
    ) -> &Self {
        self.push(
            url,
            Scripted::Reply {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.into(),
            },
        )
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.push(url, Scripted::Fail)
    }

    fn push(&self, url: &str, scripted: Scripted) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    /// Every requested URL, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requested().iter().filter(|u| *u == url).count()
    }

    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.requests.lock().unwrap().last().map(|(_, h)| h.clone())
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));

        let scripted = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match scripted {
            Some(Scripted::Reply {
                status,
                headers,
                body,
            }) => {
                let mut map = HeaderMap::new();
                for (k, v) in headers {
                    map.insert(
                        HeaderName::from_bytes(k.as_bytes()).unwrap(),
                        HeaderValue::from_str(&v).unwrap(),
                    );
                }
                Ok(HttpResponse::new(status, map, std::io::Cursor::new(body)))
            }
            Some(Scripted::Fail) => Err(ApiError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            }),
            None => Ok(HttpResponse::new(
                404,
                HeaderMap::new(),
                std::io::Cursor::new(br#"{"message":"Not Found"}"#.to_vec()),
            )),
        }
    }
}

/// Records requested sleeps instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// A clock frozen at a given Unix time.
pub struct FixedClock(pub AtomicU64);

impl FixedClock {
    pub fn at(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
