//! In-memory token repository with per-department daily counters.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::foundation::{DepartmentId, DomainError, ErrorCode, TokenId};
use crate::domain::queue::{Token, TokenRequest, TokenStatus};
use crate::ports::TokenRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenRepository {
    tokens: Arc<RwLock<HashMap<TokenId, Token>>>,
    counters: Arc<Mutex<HashMap<(DepartmentId, NaiveDate), u32>>>,
    fail_inserts: Arc<AtomicBool>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `issue` fail with a database error after drawing a number,
    /// the way a failed insert inside the counter transaction would.
    pub fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn issue(&self, request: TokenRequest) -> Result<Token, DomainError> {
        let mut counters = self.counters.lock().await;
        let key = (request.department_id.clone(), request.queue_date);
        let next = counters.get(&key).copied().unwrap_or(0) + 1;
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated token insert failure"));
        }
        let token = request.numbered(next);
        self.tokens.write().await.insert(token.id, token.clone());
        counters.insert(key, next);
        Ok(token)
    }

    async fn last_queue_number(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Option<u32>, DomainError> {
        let counters = self.counters.lock().await;
        Ok(counters.get(&(department_id.clone(), date)).copied())
    }

    async fn update(&self, token: &Token, expected: TokenStatus) -> Result<(), DomainError> {
        let mut tokens = self.tokens.write().await;
        let stored = tokens.get_mut(&token.id).ok_or_else(|| {
            DomainError::new(ErrorCode::TokenNotFound, "Token not found")
                .with_detail("id", token.id.to_string())
        })?;
        if stored.status != expected {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!("Token {} is {}, expected {}", token.id, stored.status, expected),
            ));
        }
        *stored = token.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &TokenId) -> Result<Option<Token>, DomainError> {
        Ok(self.tokens.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &TokenId) -> Result<bool, DomainError> {
        Ok(self.tokens.write().await.remove(id).is_some())
    }

    async fn list_for_day(
        &self,
        department_id: &DepartmentId,
        date: NaiveDate,
    ) -> Result<Vec<Token>, DomainError> {
        let tokens = self.tokens.read().await;
        let mut day: Vec<Token> = tokens
            .values()
            .filter(|t| &t.department_id == department_id && t.queue_date == date)
            .cloned()
            .collect();
        day.sort_by_key(|t| t.queue_number);
        Ok(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PatientId, Timestamp};

    fn dept(name: &str) -> DepartmentId {
        DepartmentId::new(name).unwrap()
    }

    fn request(department: &str, date: NaiveDate) -> TokenRequest {
        TokenRequest {
            patient_id: PatientId::new("P-1").unwrap(),
            department_id: dept(department),
            queue_date: date,
            requested_at: Timestamp::now(),
        }
    }

    async fn number(repo: &InMemoryTokenRepository, department: &str, date: NaiveDate) -> u32 {
        repo.issue(request(department, date)).await.unwrap().queue_number
    }

    #[tokio::test]
    async fn counters_are_per_department_and_day() {
        let repo = InMemoryTokenRepository::new();
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let next_day = day.succ_opt().unwrap();

        assert_eq!(number(&repo, "CARDIO", day).await, 1);
        assert_eq!(number(&repo, "CARDIO", day).await, 2);
        assert_eq!(number(&repo, "ORTHO", day).await, 1);
        assert_eq!(number(&repo, "CARDIO", next_day).await, 1);
        assert_eq!(
            repo.last_queue_number(&dept("CARDIO"), day).await.unwrap(),
            Some(2)
        );
        assert_eq!(repo.last_queue_number(&dept("ENT"), day).await.unwrap(), None);
        assert_eq!(repo.count().await, 4);
    }

    #[tokio::test]
    async fn failed_insert_consumes_no_number() {
        let repo = InMemoryTokenRepository::new();
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(number(&repo, "CARDIO", day).await, 1);

        repo.set_failing(true);
        assert!(repo.issue(request("CARDIO", day)).await.is_err());
        repo.set_failing(false);

        assert_eq!(number(&repo, "CARDIO", day).await, 2);
        assert_eq!(repo.count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_issues_never_repeat() {
        let repo = InMemoryTokenRepository::new();
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.issue(request("CARDIO", day)).await.unwrap().queue_number
            }));
        }
        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort();
        assert_eq!(numbers, (1..=50).collect::<Vec<u32>>());
    }
}
