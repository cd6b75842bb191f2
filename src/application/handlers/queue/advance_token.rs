//! AdvanceTokenHandler - Moves a token through the queue.
//!
//! Accepts the status as a string from the outer surface and parses it
//! strictly; an unrecognised value is an `InvalidState`, an illegal move an
//! `InvalidTransition`.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::domain::foundation::TokenId;
use crate::domain::queue::{Token, TokenEvent, TokenStatus};
use crate::domain::VisitError;

/// Command to move a token to `status`.
#[derive(Debug, Clone)]
pub struct AdvanceTokenCommand {
    pub token_id: TokenId,
    pub status: String,
}

impl AdvanceTokenCommand {
    /// Cancellation is an advance to `cancelled`.
    pub fn cancel(token_id: TokenId) -> Self {
        Self {
            token_id,
            status: TokenStatus::Cancelled.as_str().to_string(),
        }
    }
}

pub struct AdvanceTokenHandler {
    ctx: Arc<VisitContext>,
}

impl AdvanceTokenHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: AdvanceTokenCommand) -> Result<Token, VisitError> {
        let target: TokenStatus = cmd.status.parse()?;

        let _guard = self.ctx.locks.acquire(LockKey::Token(cmd.token_id)).await;
        let mut token = self
            .ctx
            .tokens
            .find_by_id(&cmd.token_id)
            .await?
            .ok_or_else(|| VisitError::not_found("token", cmd.token_id))?;

        let now = self.ctx.now();
        let previous = token.advance(target, now)?;
        self.ctx.tokens.update(&token, previous).await?;

        tracing::info!(
            token_id = %token.id,
            department_id = %token.department_id,
            queue_number = token.queue_number,
            from = %previous,
            to = %token.status,
            "Token advanced"
        );

        self.ctx
            .emit(&TokenEvent::Advanced {
                token_id: token.id,
                department_id: token.department_id.clone(),
                queue_number: token.queue_number,
                from: previous,
                to: token.status,
                occurred_at: now,
            })
            .await;

        Ok(token)
    }
}
