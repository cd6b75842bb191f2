//! GenerateTokenHandler - Issues the next walk-in token for a department.

use std::sync::Arc;

use crate::application::context::VisitContext;
use crate::application::locks::LockKey;
use crate::domain::foundation::{DepartmentId, PatientId};
use crate::domain::queue::{Token, TokenEvent, TokenRequest};
use crate::domain::VisitError;

/// Command to queue a walk-in patient.
#[derive(Debug, Clone)]
pub struct GenerateTokenCommand {
    pub patient_id: PatientId,
    pub department_id: DepartmentId,
}

/// Handler for token issue.
///
/// Numbers come from the store's per-(department, day) counter, drawn in
/// the same atomic step that stores the token, so they are unique and
/// gap-free within a day even across processes. The in-process lock only
/// keeps local callers from piling onto the counter.
pub struct GenerateTokenHandler {
    ctx: Arc<VisitContext>,
}

impl GenerateTokenHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: GenerateTokenCommand) -> Result<Token, VisitError> {
        let now = self.ctx.now();
        let today = self.ctx.today(now);

        let token = {
            let _guard = self
                .ctx
                .locks
                .acquire(LockKey::QueueCounter(cmd.department_id.clone(), today))
                .await;
            self.ctx
                .tokens
                .issue(TokenRequest {
                    patient_id: cmd.patient_id,
                    department_id: cmd.department_id,
                    queue_date: today,
                    requested_at: now,
                })
                .await?
        };

        tracing::info!(
            token_id = %token.id,
            department_id = %token.department_id,
            queue_number = token.queue_number,
            "Token issued"
        );

        self.ctx
            .emit(&TokenEvent::Issued {
                token_id: token.id,
                patient_id: token.patient_id.clone(),
                department_id: token.department_id.clone(),
                queue_date: token.queue_date,
                queue_number: token.queue_number,
                occurred_at: now,
            })
            .await;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{clinic_day, department, patient, Harness};
    use crate::domain::queue::TokenStatus;

    fn command(department_id: &str) -> GenerateTokenCommand {
        GenerateTokenCommand {
            patient_id: patient("P-1"),
            department_id: department(department_id),
        }
    }

    #[tokio::test]
    async fn first_token_of_the_day_is_number_one() {
        let h = Harness::new();
        let token = GenerateTokenHandler::new(h.ctx.clone())
            .handle(command("CARDIO"))
            .await
            .unwrap();

        assert_eq!(token.queue_number, 1);
        assert_eq!(token.status, TokenStatus::Waiting);
        assert_eq!(token.queue_date, clinic_day());
        assert!(h.events.has_event("token.issued.v1"));
    }

    #[tokio::test]
    async fn departments_count_independently() {
        let h = Harness::new();
        let handler = GenerateTokenHandler::new(h.ctx.clone());

        let a1 = handler.handle(command("CARDIO")).await.unwrap();
        let a2 = handler.handle(command("CARDIO")).await.unwrap();
        let b1 = handler.handle(command("ORTHO")).await.unwrap();

        assert_eq!((a1.queue_number, a2.queue_number, b1.queue_number), (1, 2, 1));
    }

    #[tokio::test]
    async fn failed_issue_leaves_no_gap() {
        let h = Harness::new();
        let handler = GenerateTokenHandler::new(h.ctx.clone());
        handler.handle(command("CARDIO")).await.unwrap();

        h.tokens.set_failing(true);
        let err = handler.handle(command("CARDIO")).await.unwrap_err();
        assert!(matches!(err, VisitError::Infrastructure(_)));
        h.tokens.set_failing(false);

        let next = handler.handle(command("CARDIO")).await.unwrap();
        assert_eq!(next.queue_number, 2);
        assert_eq!(h.events.events_of_type("token.issued.v1").len(), 2);
    }

    #[tokio::test]
    async fn numbering_restarts_the_next_day() {
        let h = Harness::new();
        let handler = GenerateTokenHandler::new(h.ctx.clone());
        handler.handle(command("CARDIO")).await.unwrap();
        handler.handle(command("CARDIO")).await.unwrap();

        h.clock.advance_minutes(24 * 60);
        let next_day = handler.handle(command("CARDIO")).await.unwrap();

        assert_eq!(next_day.queue_number, 1);
        assert_eq!(next_day.queue_date, clinic_day().succ_opt().unwrap());
    }

    #[tokio::test]
    async fn concurrent_issue_yields_distinct_consecutive_numbers() {
        let h = Harness::new();
        let handler = Arc::new(GenerateTokenHandler::new(h.ctx.clone()));

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move { handler.handle(command("CARDIO")).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for task in tasks {
            numbers.push(task.await.unwrap().unwrap().queue_number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=25).collect::<Vec<u32>>());
    }
}
