//! Challenge submission flow
//!
//! click → build message (request time fixed) → sign → submit → ranked entry.
//! Only one attempt may be in flight; the submitting flag is cleared on
//! every exit path so a failed attempt can be retried.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};
use types::leaderboard::{LeaderboardEntry, SubmitMessageRequest};
use uuid::Uuid;

use crate::client::RankingClient;
use crate::error::SubmissionError;
use crate::models::{ChallengeMessage, format_request_time};
use crate::signer::MessageSigner;

/// A ranked attempt: what was signed and what the service made of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub message: ChallengeMessage,
    pub entry: LeaderboardEntry,
}

pub struct ChallengeSession<S: MessageSigner> {
    client: RankingClient,
    signer: S,
    submitting: AtomicBool,
}

impl<S: MessageSigner> ChallengeSession<S> {
    pub fn new(client: RankingClient, signer: S) -> Self {
        Self {
            client,
            signer,
            submitting: AtomicBool::new(false),
        }
    }

    /// Whether an attempt is currently in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Run one attempt end to end.
    pub async fn attempt(&self) -> Result<Attempt, SubmissionError> {
        let _guard = SubmittingGuard::acquire(&self.submitting)?;
        let attempt_id = Uuid::now_v7();

        let result = self.run(attempt_id).await;
        if let Err(e) = &result {
            warn!(%attempt_id, error = %e, "Challenge attempt failed");
        }
        result
    }

    async fn run(&self, attempt_id: Uuid) -> Result<Attempt, SubmissionError> {
        // 1. Fix the request time before the signer gets involved
        let message = ChallengeMessage::new();
        let payload = message
            .to_payload()
            .map_err(|e| SubmissionError::Encode(e.to_string()))?;
        info!(
            %attempt_id,
            request_time = %format_request_time(&message.request_time),
            "Challenge started"
        );

        // 2. Sign
        let signature = self.signer.sign(&payload).await?;

        // 3. Submit
        let entry = self
            .client
            .submit(&SubmitMessageRequest {
                message: payload,
                signature,
            })
            .await?;

        info!(
            %attempt_id,
            position = entry.position,
            reaction_millis = entry.reaction_millis,
            flash_block_millis = entry.flash_block_millis,
            ratio = entry.ratio,
            "Challenge ranked"
        );
        Ok(Attempt { message, entry })
    }
}

/// Holds the submitting flag for the duration of an attempt.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SubmissionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmissionError::AlreadySubmitting)?;
        Ok(Self(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
