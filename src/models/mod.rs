pub mod contracts;
pub mod jobs;
pub mod milestones;
pub mod payments;
pub mod reconciliations;
pub mod users;
pub mod wallet_entries;
pub mod withdrawals;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::PaginationQuery;

    fn query(page: Option<u64>, limit: Option<u64>) -> PaginationQuery {
        PaginationQuery { page, limit }
    }

    #[test]
    fn limit_defaults_and_stays_within_bounds() {
        assert_eq!(query(None, None).limit(), 20);
        assert_eq!(query(None, Some(0)).limit(), 1);
        assert_eq!(query(None, Some(50)).limit(), 50);
        assert_eq!(query(None, Some(1000)).limit(), 100);
    }

    #[test]
    fn page_starts_at_one() {
        assert_eq!(query(None, None).page(), 1);
        assert_eq!(query(Some(0), None).page(), 1);
        assert_eq!(query(Some(3), None).page(), 3);
    }
}
