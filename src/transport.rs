//! One-way senders
//!
//! A sender takes a finished beacon URL and does something with it. None of
//! them report back: network failures are logged and dropped.

use colored::*;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Fire-and-forget URL sink
pub trait Sender: Send + Sync {
    fn send(&self, url: &str);
}

/// Issues a GET per beacon and ignores the response
pub struct HttpSender {
    agent: ureq::Agent,
    detach: bool,
}

impl HttpSender {
    /// Detached by default: `send` returns before the request completes
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, detach: true }
    }

    /// Run requests on the calling thread instead
    pub fn attached(mut self) -> Self {
        self.detach = false;
        self
    }

    fn get(agent: &ureq::Agent, url: &str) {
        match agent.get(url).call() {
            Ok(response) => log::debug!("Beacon sent ({}): {}", response.status(), url),
            Err(e) => log::warn!("Beacon request failed for {}: {}", url, e),
        }
    }
}

impl Default for HttpSender {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Sender for HttpSender {
    fn send(&self, url: &str) {
        if !self.detach {
            Self::get(&self.agent, url);
            return;
        }

        let agent = self.agent.clone();
        let url = url.to_string();
        let spawned = thread::Builder::new()
            .name("beacon-send".to_string())
            .spawn(move || Self::get(&agent, &url));
        if let Err(e) = spawned {
            log::warn!("Failed to spawn beacon sender: {}", e);
        }
    }
}

/// Mirrors URLs to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

impl Sender for LogSender {
    fn send(&self, url: &str) {
        log::info!("BI: {}", url);
    }
}

/// Prints URLs, for dry runs
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSender;

impl Sender for StdoutSender {
    fn send(&self, url: &str) {
        println!("{} {}", "BI:".dimmed(), url);
    }
}

/// Records every URL it is given. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingSender {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }
}

impl Sender for RecordingSender {
    fn send(&self, url: &str) {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sender_shares_record() {
        let recorder = RecordingSender::new();
        let handle = recorder.clone();

        recorder.send("http://h/a");
        handle.send("http://h/b");

        assert_eq!(recorder.urls(), vec!["http://h/a", "http://h/b"]);
        assert_eq!(handle.last().as_deref(), Some("http://h/b"));
    }

    #[test]
    fn test_http_sender_swallows_failures() {
        // Nothing listens on port 9 of the discard range; must not panic or block long
        let sender = HttpSender::new(Duration::from_millis(200)).attached();
        sender.send("http://127.0.0.1:9/e?evid=x");
    }

    #[test]
    fn test_http_sender_swallows_malformed_url() {
        let sender = HttpSender::default().attached();
        sender.send("not a url");
    }

    #[test]
    fn test_log_sender_does_not_panic() {
        LogSender.send("http://h/e?evid=x");
    }
}
