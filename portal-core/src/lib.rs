pub mod clock;
pub mod error;
pub mod expiration;
pub mod job;
pub mod model;
pub mod query;
pub mod reports;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Entity, PortalError, Result};
pub use expiration::{EXPIRY_WINDOW_DAYS, ExpirationScanJob, expiring_policy_notices, expiry_message};
pub use job::{Job, JobReport, RunReason};
pub use model::*;
pub use query::{
    ClaimQuery, ClaimSortKey, DocumentQuery, DocumentSortKey, InsuranceQuery, InsuranceSortKey,
    ListQuery, Listable, SortDirection, SortSpec, StatusFilter, TicketQuery, TicketSortKey,
};
pub use reports::{
    AdminDashboard, ClaimStats, Client, ClientDashboard, ClientQuery, ClientSortKey, ClientStatus,
    ContractStats, Reports, SupportStats,
};
pub use scheduler::{ScheduledJob, Scheduler};
pub use store::{PortalState, PortalStore};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn scheduled_scanner_follows_policy_changes() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        ));
        let store = Arc::new(PortalStore::with_clock(clock.clone()));
        store
            .submit_insurance(NewInsurance {
                kind: InsuranceKind::Home,
                contract_number: Some("HOME-1".to_string()),
                start_date: "2023-06-01".to_string(),
                end_date: "2024-06-15".to_string(),
                premium: 300.0,
            })
            .await;

        let scheduler = Scheduler::new(std::time::Duration::from_secs(24 * 60 * 60)).unwrap();
        let scanner = scheduler.spawn(
            Arc::new(ExpirationScanJob::new(store.clone())),
            store.policy_changes(),
        );
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        fn expiring(notifications: &[Notification]) -> usize {
            notifications
                .iter()
                .filter(|n| n.message.contains("expires"))
                .count()
        }
        assert_eq!(expiring(&store.notifications().await), 1);

        // a new policy that is already inside the window is picked up without waiting a day
        let end = (clock.now() + Duration::days(20)).format("%Y-%m-%d").to_string();
        store
            .submit_insurance(NewInsurance {
                kind: InsuranceKind::Auto,
                contract_number: None,
                start_date: "2023-06-21".to_string(),
                end_date: end,
                premium: 510.0,
            })
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        assert_eq!(expiring(&store.notifications().await), 2);

        // a far-off policy only enters the window once the clock moves
        store
            .submit_insurance(NewInsurance {
                kind: InsuranceKind::Life,
                contract_number: None,
                start_date: "2024-01-01".to_string(),
                end_date: "2024-08-15".to_string(),
                premium: 90.0,
            })
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        assert_eq!(expiring(&store.notifications().await), 2);

        clock.advance(Duration::days(60));
        tokio::time::sleep(std::time::Duration::from_secs(24 * 60 * 60)).await;
        assert_eq!(expiring(&store.notifications().await), 3);

        scanner.shutdown().await.unwrap();
    }
}
