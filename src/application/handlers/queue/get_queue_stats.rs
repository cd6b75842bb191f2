//! GetQueueStatsHandler - Query handler for a department's queue counts.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::application::context::VisitContext;
use crate::domain::foundation::DepartmentId;
use crate::domain::queue::QueueStats;
use crate::domain::VisitError;

/// Query for one department's day; `date` defaults to today.
#[derive(Debug, Clone)]
pub struct GetQueueStatsQuery {
    pub department_id: DepartmentId,
    pub date: Option<NaiveDate>,
}

pub struct GetQueueStatsHandler {
    ctx: Arc<VisitContext>,
}

impl GetQueueStatsHandler {
    pub fn new(ctx: Arc<VisitContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, query: GetQueueStatsQuery) -> Result<QueueStats, VisitError> {
        let date = query
            .date
            .unwrap_or_else(|| self.ctx.today(self.ctx.now()));

        let tokens = self
            .ctx
            .tokens
            .list_for_day(&query.department_id, date)
            .await?;
        let last_issued = self
            .ctx
            .tokens
            .last_queue_number(&query.department_id, date)
            .await?;

        Ok(QueueStats::from_tokens(
            query.department_id,
            date,
            &tokens,
            last_issued,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::queue::{
        AdvanceTokenCommand, AdvanceTokenHandler, GenerateTokenCommand, GenerateTokenHandler,
    };
    use crate::application::test_support::{clinic_day, department, patient, Harness};
    use crate::domain::queue::Token;

    #[tokio::test]
    async fn counts_reflect_token_statuses() {
        let h = Harness::new();
        let issue = GenerateTokenHandler::new(h.ctx.clone());
        let advance = AdvanceTokenHandler::new(h.ctx.clone());

        let mut tokens = Vec::new();
        for i in 0..4 {
            tokens.push(
                issue
                    .handle(GenerateTokenCommand {
                        patient_id: patient(&format!("P-{}", i)),
                        department_id: department("CARDIO"),
                    })
                    .await
                    .unwrap(),
            );
        }
        let status = |token: &Token, s: &str| AdvanceTokenCommand {
            token_id: token.id,
            status: s.to_string(),
        };
        advance.handle(status(&tokens[0], "in_progress")).await.unwrap();
        advance.handle(status(&tokens[0], "completed")).await.unwrap();
        advance.handle(status(&tokens[1], "in_progress")).await.unwrap();
        advance.handle(AdvanceTokenCommand::cancel(tokens[2].id)).await.unwrap();

        let stats = GetQueueStatsHandler::new(h.ctx.clone())
            .handle(GetQueueStatsQuery {
                department_id: department("CARDIO"),
                date: None,
            })
            .await
            .unwrap();

        assert_eq!(stats.date, clinic_day());
        assert_eq!(
            (stats.waiting, stats.in_progress, stats.completed, stats.cancelled),
            (1, 1, 1, 1)
        );
        assert_eq!(stats.last_issued, Some(4));
    }

    #[tokio::test]
    async fn empty_day_has_no_last_issued() {
        let h = Harness::new();
        let stats = GetQueueStatsHandler::new(h.ctx.clone())
            .handle(GetQueueStatsQuery {
                department_id: department("CARDIO"),
                date: Some(clinic_day()),
            })
            .await
            .unwrap();

        assert_eq!(stats.waiting + stats.in_progress + stats.completed, 0);
        assert_eq!(stats.last_issued, None);
    }
}
