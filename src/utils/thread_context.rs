//! Background-task lifecycle (§5.1): every long-running loop (monitor session, coordinator
//! heartbeat/election/sync, ingester, self-monitor) is started as a [`StartedThreadContext`]
//! and stopped by publishing a cancellation message and joining with bounded retry.

use std::thread::{sleep, JoinHandle};
use std::time::Duration;

use crate::event::channel::{pub_sub, EventConsumer, EventPublisher};
use crate::event::cancellation::CancellationMessage;
use crate::utils::threads::spawn_named_thread;

const GRACEFUL_STOP_RETRY: u16 = 10;
const GRACEFUL_STOP_RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub struct NotStartedThreadContext<F, T>
where
    F: FnOnce(EventConsumer<CancellationMessage>) -> T + Send + 'static,
    T: Send + 'static,
{
    thread_name: String,
    callback: F,
}

impl<F, T> NotStartedThreadContext<F, T>
where
    F: FnOnce(EventConsumer<CancellationMessage>) -> T + Send + 'static,
    T: Send + 'static,
{
    pub fn new<S: Into<String>>(thread_name: S, callback: F) -> Self {
        Self {
            thread_name: thread_name.into(),
            callback,
        }
    }

    pub fn start(self) -> StartedThreadContext {
        let (stop_publisher, stop_consumer) = pub_sub::<CancellationMessage>();

        StartedThreadContext::new(
            self.thread_name.clone(),
            stop_publisher,
            spawn_named_thread(&self.thread_name, move || {
                (self.callback)(stop_consumer);
            }),
        )
    }
}

pub struct StartedThreadContext {
    thread_name: String,
    stop_publisher: EventPublisher<CancellationMessage>,
    join_handle: JoinHandle<()>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ThreadContextStopperError {
    #[error("error sending stop signal to '{0}' thread: {1}")]
    EventPublisherError(String, String),

    #[error("error joining '{0}' thread")]
    JoinError(String),

    #[error("timeout waiting for '{0}' thread to finish")]
    StopTimeout(String),
}

impl StartedThreadContext {
    pub fn new(
        thread_name: String,
        stop_publisher: EventPublisher<CancellationMessage>,
        join_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            thread_name,
            stop_publisher,
            join_handle,
        }
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Sends a stop signal and polls until the thread finishes, up to
    /// `GRACEFUL_STOP_RETRY * GRACEFUL_STOP_RETRY_INTERVAL`.
    pub fn stop(self) -> Result<(), ThreadContextStopperError> {
        self.stop_publisher.publish(()).map_err(|err| {
            ThreadContextStopperError::EventPublisherError(self.thread_name.clone(), err.to_string())
        })?;
        for _ in 0..GRACEFUL_STOP_RETRY {
            if self.join_handle.is_finished() {
                return self.join_handle.join().map_err(|err| {
                    ThreadContextStopperError::JoinError(
                        err.downcast_ref::<&str>().unwrap_or(&"unknown error").to_string(),
                    )
                });
            }
            sleep(GRACEFUL_STOP_RETRY_INTERVAL);
        }
        Err(ThreadContextStopperError::StopTimeout(self.thread_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn stop_joins_a_cooperating_thread() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let ctx = NotStartedThreadContext::new("test-thread", move |stop| {
            loop {
                if stop.recv_timeout(Duration::from_millis(10)).is_some() {
                    ran_clone.store(true, Ordering::SeqCst);
                    break;
                }
            }
        })
        .start();
        ctx.stop().unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
