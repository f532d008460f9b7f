//! In-memory reward ledger.
//!
//! Idempotent by construction: credits are keyed by session id, and a
//! repeated credit returns the transaction recorded the first time instead
//! of applying again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use viva_core::error::SessionError;
use viva_core::model::RewardTransaction;
use viva_core::traits::RewardLedger;

/// Reward ledger backed by a process-local map.
pub struct InMemoryLedger {
    transactions: Mutex<HashMap<Uuid, RewardTransaction>>,
    /// Remaining number of calls to fail, for retry tests.
    fail_times: AtomicU32,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            fail_times: AtomicU32::new(0),
        }
    }

    /// Make the next `n` credit calls fail with a retryable error.
    pub fn fail_next(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }

    /// Sum of all applied credits.
    pub fn balance(&self) -> i64 {
        self.transactions
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .map(|t| t.points_delta)
            .sum()
    }

    /// The transaction recorded for a session, if any.
    pub fn transaction_for(&self, session_id: Uuid) -> Option<RewardTransaction> {
        self.transactions
            .lock()
            .expect("ledger mutex poisoned")
            .get(&session_id)
            .cloned()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewardLedger for InMemoryLedger {
    async fn credit(
        &self,
        session_id: Uuid,
        points_delta: i64,
    ) -> Result<RewardTransaction, SessionError> {
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::RewardFailed(
                "ledger temporarily unavailable".into(),
            ));
        }

        let mut transactions = self.transactions.lock().expect("ledger mutex poisoned");
        if let Some(existing) = transactions.get(&session_id) {
            // Already credited: return the prior transaction unchanged.
            return Ok(existing.clone());
        }

        let transaction = RewardTransaction {
            id: Uuid::new_v4(),
            session_id,
            points_delta,
            timestamp: Utc::now(),
        };
        transactions.insert(session_id, transaction.clone());
        Ok(transaction)
    }
}
