//! Replay provider for scripted message sequences

use std::collections::VecDeque;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, trace};

use crate::provider::Provider;
use crate::{BenchError, Result};

/// How a replay behaves once its script is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplayEnd {
    /// End the stream normally
    #[default]
    Finish,
    /// Stay silent until closed, like a server that stopped sending
    Stall,
    /// Fail with a transport error
    Fail(String),
}

/// Provider that plays back messages at fixed offsets from its first read
pub struct ReplayProvider {
    name: String,
    script: VecDeque<(Duration, Vec<u8>)>,
    origin: Option<Instant>,
    end: ReplayEnd,
    closed: bool,
}

impl ReplayProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: VecDeque::new(),
            origin: None,
            end: ReplayEnd::default(),
            closed: false,
        }
    }

    /// Play `messages` back to back, one every `interval`, starting immediately.
    pub fn paced<I>(name: impl Into<String>, messages: I, interval: Duration) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut replay = Self::new(name);
        for (i, message) in messages.into_iter().enumerate() {
            replay = replay.push(interval * i as u32, message);
        }
        replay
    }

    /// Schedule `message` at `offset` from the first read.
    ///
    /// Offsets earlier than the previous message are delivered right after it.
    pub fn push(mut self, offset: Duration, message: Vec<u8>) -> Self {
        let offset = self.script.back().map_or(offset, |(last, _)| offset.max(*last));
        self.script.push_back((offset, message));
        self
    }

    pub fn end_with(mut self, end: ReplayEnd) -> Self {
        self.end = end;
        self
    }

    /// Messages not yet delivered.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        if self.closed {
            return Ok(None);
        }
        let origin = *self.origin.get_or_insert_with(Instant::now);

        let Some((offset, message)) = self.script.pop_front() else {
            return match &self.end {
                ReplayEnd::Finish => {
                    debug!(replay = %self.name, "Reached end of replay");
                    Ok(None)
                }
                ReplayEnd::Stall => {
                    debug!(replay = %self.name, "Replay stalled");
                    std::future::pending().await
                }
                ReplayEnd::Fail(reason) => Err(BenchError::Transport {
                    reason: reason.clone(),
                    source: None,
                }),
            };
        };

        // Pacing
        sleep_until(origin + offset).await;
        trace!(replay = %self.name, ?offset, bytes = message.len(), "Replayed message");
        Ok(Some(message))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.script.clear();
        Ok(())
    }

    fn target(&self) -> &str {
        &self.name
    }
}
