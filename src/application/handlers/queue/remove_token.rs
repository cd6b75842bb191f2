//! RemoveTokenHandler - Hard-deletes a token.
//!
//! Finished tokens (completed or cancelled) may be removed freely. Removing
//! a live token is an administrative correction and requires an explicit
//! override, which is written to the audit log.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::domain::foundation::{StaffId, TokenId};
use crate::domain::queue::{Token, TokenEvent};
use crate::domain::VisitError;

/// Command to delete a token.
#[derive(Debug, Clone)]
pub struct RemoveTokenCommand {
    pub token_id: TokenId,
    pub staff_id: StaffId,
    pub admin_override: bool,
}

pub struct RemoveTokenHandler {
    ctx: Arc<VisitContext>,
}

impl RemoveTokenHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: RemoveTokenCommand) -> Result<Token, VisitError> {
        let _guard = self.ctx.locks.acquire(LockKey::Token(cmd.token_id)).await;
        let token = self
            .ctx
            .tokens
            .find_by_id(&cmd.token_id)
            .await?
            .ok_or_else(|| VisitError::not_found("token", cmd.token_id))?;

        let forced = !token.status.is_removable();
        if forced && !cmd.admin_override {
            return Err(VisitError::invalid_state(format!(
                "Token {} is {}; only completed or cancelled tokens can be removed",
                token.id, token.status
            )));
        }

        if !self.ctx.tokens.delete(&token.id).await? {
            return Err(VisitError::not_found("token", token.id));
        }

        if forced {
            tracing::warn!(
                audit = true,
                token_id = %token.id,
                department_id = %token.department_id,
                queue_number = token.queue_number,
                status = %token.status,
                staff_id = %cmd.staff_id,
                "Live token removed by administrative override"
            );
        } else {
            tracing::info!(
                token_id = %token.id,
                staff_id = %cmd.staff_id,
                "Token removed"
            );
        }

        self.ctx
            .emit(&TokenEvent::Removed {
                token_id: token.id,
                department_id: token.department_id.clone(),
                status: token.status,
                admin_override: forced,
                occurred_at: self.ctx.now(),
            })
            .await;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::queue::{
        AdvanceTokenCommand, AdvanceTokenHandler, GenerateTokenCommand, GenerateTokenHandler,
    };
    use crate::application::test_support::{department, patient, Harness};

    async fn issue(h: &Harness) -> Token {
        GenerateTokenHandler::new(h.ctx.clone())
            .handle(GenerateTokenCommand {
                patient_id: patient("P-1"),
                department_id: department("CARDIO"),
            })
            .await
            .unwrap()
    }

    fn remove(token: &Token, admin_override: bool) -> RemoveTokenCommand {
        RemoveTokenCommand {
            token_id: token.id,
            staff_id: StaffId::new("S-9").unwrap(),
            admin_override,
        }
    }

    #[tokio::test]
    async fn cancelled_token_can_be_removed() {
        let h = Harness::new();
        let token = issue(&h).await;
        AdvanceTokenHandler::new(h.ctx.clone())
            .handle(AdvanceTokenCommand::cancel(token.id))
            .await
            .unwrap();

        RemoveTokenHandler::new(h.ctx.clone())
            .handle(remove(&token, false))
            .await
            .unwrap();

        assert_eq!(h.tokens.count().await, 0);
        assert!(h.events.has_event("token.removed.v1"));
    }

    #[tokio::test]
    async fn waiting_token_needs_an_override() {
        let h = Harness::new();
        let token = issue(&h).await;
        let handler = RemoveTokenHandler::new(h.ctx.clone());

        let err = handler.handle(remove(&token, false)).await.unwrap_err();
        assert!(matches!(err, VisitError::InvalidState { .. }));
        assert_eq!(h.tokens.count().await, 1);

        handler.handle(remove(&token, true)).await.unwrap();
        assert_eq!(h.tokens.count().await, 0);
    }

    #[tokio::test]
    async fn removing_twice_is_not_found() {
        let h = Harness::new();
        let token = issue(&h).await;
        let handler = RemoveTokenHandler::new(h.ctx.clone());
        handler.handle(remove(&token, true)).await.unwrap();

        let err = handler.handle(remove(&token, true)).await.unwrap_err();
        assert!(matches!(err, VisitError::NotFound { .. }));
    }

    #[tokio::test]
    async fn removal_does_not_reuse_queue_numbers() {
        let h = Harness::new();
        let first = issue(&h).await;
        RemoveTokenHandler::new(h.ctx.clone())
            .handle(remove(&first, true))
            .await
            .unwrap();

        let second = issue(&h).await;
        assert_eq!(second.queue_number, 2);
    }
}
