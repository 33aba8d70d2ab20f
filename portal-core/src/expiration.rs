//! Policy expiration notices.
//!
//! A policy is "expiring" once its end date is at most [`EXPIRY_WINDOW_DAYS`]
//! days away, and stays expiring after the date has passed. Each expiring
//! policy yields a templated message; the store suppresses any message that
//! is already held, so repeated passes over an unchanged policy list add
//! nothing after the first one.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::job::{Job, JobReport, RunReason};
use crate::model::{Insurance, InsuranceKind, parse_portal_date_as_written};
use crate::store::PortalStore;

pub const EXPIRY_WINDOW_DAYS: i64 = 30;

/// The date is shown in the offset `end` carries, i.e. as the policy was written.
pub fn expiry_message<Tz>(kind: InsuranceKind, end: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "Your {} insurance expires on {}",
        kind,
        end.format("%d/%m/%Y")
    )
}

/// Messages for every policy whose end date falls on or before `now + 30 days`,
/// in policy order. Policies with an unreadable end date are skipped.
pub fn expiring_policy_notices(policies: &[Insurance], now: DateTime<Utc>) -> Vec<String> {
    let threshold = now + Duration::days(EXPIRY_WINDOW_DAYS);

    policies
        .iter()
        .filter_map(|policy| match parse_portal_date_as_written(&policy.end_date) {
            Ok(end) if end <= threshold => Some(expiry_message(policy.kind, end)),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    policy_id = %policy.id,
                    end_date = %policy.end_date,
                    error = %e,
                    "Skipping policy with unreadable end date"
                );
                None
            }
        })
        .collect()
}

/// Scheduled pass of [`PortalStore::scan_expirations`]
pub struct ExpirationScanJob {
    store: Arc<PortalStore>,
}

impl ExpirationScanJob {
    pub fn new(store: Arc<PortalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Job for ExpirationScanJob {
    fn id(&self) -> &str {
        "expiration_scan"
    }

    async fn run(&self, reason: RunReason) -> Result<JobReport> {
        debug!(reason = ?reason, "running job: {}", self.id());

        let examined = self.store.policy_count().await;
        let inserted = self.store.scan_expirations().await;

        Ok(JobReport::new(examined, inserted.len())
            .with_summary(format!("{} new expiration notices", inserted.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContractStatus;
    use chrono::TimeZone;

    fn policy(id: &str, kind: InsuranceKind, end: &str) -> Insurance {
        Insurance {
            id: id.to_string(),
            kind,
            contract_number: format!("C-{}", id),
            start_date: "2024-01-01".to_string(),
            end_date: end.to_string(),
            premium: 420.0,
            status: ContractStatus::Active,
            documents: vec![],
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn message_names_type_and_date() {
        let end = Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap();
        assert_eq!(
            expiry_message(InsuranceKind::Auto, end),
            "Your auto insurance expires on 11/06/2024"
        );
    }

    #[test]
    fn window_is_inclusive_and_covers_past_dates() {
        let policies = vec![
            policy("soon", InsuranceKind::Auto, "2024-06-11"),
            policy("far", InsuranceKind::Home, "2024-09-01"),
            policy("past", InsuranceKind::Life, "2024-01-31"),
            policy("edge", InsuranceKind::Health, "2024-07-01T10:00:00Z"),
            policy("just_out", InsuranceKind::Liability, "2024-07-01T10:00:01Z"),
        ];

        let notices = expiring_policy_notices(&policies, now());
        assert_eq!(
            notices,
            vec![
                "Your auto insurance expires on 11/06/2024".to_string(),
                "Your life insurance expires on 31/01/2024".to_string(),
                "Your health insurance expires on 01/07/2024".to_string(),
            ]
        );
    }

    #[test]
    fn offset_end_dates_keep_the_written_day() {
        // 2024-07-01T00:30+02:00 is 30/06 in UTC but the policy says 01/07
        let policies = vec![policy("tz", InsuranceKind::Auto, "2024-07-01T00:30:00+02:00")];

        assert_eq!(
            expiring_policy_notices(&policies, now()),
            vec!["Your auto insurance expires on 01/07/2024".to_string()]
        );
    }

    #[test]
    fn unreadable_end_dates_are_skipped() {
        let policies = vec![
            policy("bad", InsuranceKind::Auto, "soon-ish"),
            policy("good", InsuranceKind::Home, "2024-06-05"),
        ];

        let notices = expiring_policy_notices(&policies, now());
        assert_eq!(notices, vec!["Your home insurance expires on 05/06/2024".to_string()]);
    }
}
