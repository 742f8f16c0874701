//! SummarySink trait: where end-of-session summaries go.
//!
//! The SUMMARIZE phase hands its text to the sink; the next session may read
//! the most recent one back to seed its environment reminder.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::todo::SessionId;

#[async_trait]
pub trait SummarySink: Send + Sync {
    fn name(&self) -> &str;

    /// Persist the summary produced for `session`.
    async fn save(&self, session: &SessionId, summary: &str) -> Result<(), StoreError>;

    /// The most recently saved summary across sessions, if any.
    async fn latest(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
