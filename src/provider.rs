//! Provider trait for inbound message sources

use crate::Result;

/// Trait for sources of inbound server messages
///
/// Providers abstract over where messages come from (a live WebSocket, a
/// scripted replay) and handle their own pacing internally.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next binary message
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - New message available
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(e)` - Transport failure; the session ends, there is no reconnect
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>>;

    /// Close the underlying transport. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;

    /// Human-readable description of the source, used in logs and errors
    fn target(&self) -> &str;
}
