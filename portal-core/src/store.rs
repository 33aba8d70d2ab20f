use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Entity, PortalError, Result};
use crate::expiration::expiring_policy_notices;
use crate::model::{
    Claim, ClaimStatus, ContractStatus, Document, Insurance, NewClaim, NewDocument, NewInsurance,
    NewSupportTicket, Notification, Settings, SupportResponse, SupportTicket, TicketStatus,
    human_size,
};
use crate::query::{ClaimQuery, DocumentQuery, InsuranceQuery, TicketQuery};
use crate::reports::{
    AdminDashboard, Client, ClientDashboard, ClientQuery, Reports, admin_dashboard,
    client_dashboard, derive_clients, reports,
};

pub const CLAIM_RECORDED: &str = "Your claim declaration has been recorded successfully.";
pub const SUBSCRIPTION_RECORDED: &str = "Your subscription request has been recorded successfully.";
pub const SUPPORT_RECORDED: &str = "Your support request has been recorded successfully.";

const CONTRACT_NUMBER_LEN: usize = 9;

/// Every collection the portals work on. Collections are ordered most recent first.
#[derive(Debug, Clone, Default)]
pub struct PortalState {
    pub claims: Vec<Claim>,
    pub insurances: Vec<Insurance>,
    pub tickets: Vec<SupportTicket>,
    pub documents: Vec<Document>,
    pub notifications: Vec<Notification>,
    pub settings: Settings,
}

impl PortalState {
    fn notify(&mut self, message: impl Into<String>, clock: &dyn Clock) -> Notification {
        let notification = Notification {
            id: new_id(),
            message: message.into(),
            date: clock.now(),
            read: false,
        };
        self.notifications.insert(0, notification.clone());
        notification
    }

    fn holds_message(&self, message: &str) -> bool {
        self.notifications.iter().any(|n| n.message == message)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn new_contract_number() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CONTRACT_NUMBER_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

/// Application state shared by both portals.
///
/// All commands take the write lock for a single synchronous mutation, so
/// readers never observe a record without its confirmation notification.
pub struct PortalStore {
    state: RwLock<PortalState>,
    clock: Arc<dyn Clock>,
    policy_changes: Arc<Notify>,
}

impl PortalStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(PortalState::default()),
            clock,
            policy_changes: Arc::new(Notify::new()),
        }
    }

    /// Notified whenever the policy collection changes; hand it to the scheduler
    pub fn policy_changes(&self) -> Arc<Notify> {
        self.policy_changes.clone()
    }

    pub async fn snapshot(&self) -> PortalState {
        self.state.read().await.clone()
    }

    pub async fn submit_claim(&self, input: NewClaim) -> Claim {
        let now = self.clock.now();
        let claim = Claim {
            id: new_id(),
            kind: input.kind,
            description: input.description,
            date: input.date,
            status: ClaimStatus::Pending,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.claims.insert(0, claim.clone());
        state.notify(CLAIM_RECORDED, self.clock.as_ref());

        info!(claim_id = %claim.id, claim_type = %claim.kind, "Claim submitted");
        claim
    }

    pub async fn submit_insurance(&self, input: NewInsurance) -> Insurance {
        let insurance = Insurance {
            id: new_id(),
            kind: input.kind,
            contract_number: input
                .contract_number
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(new_contract_number),
            start_date: input.start_date,
            end_date: input.end_date,
            premium: input.premium,
            status: ContractStatus::Pending,
            documents: Vec::new(),
        };

        {
            let mut state = self.state.write().await;
            state.insurances.insert(0, insurance.clone());
            state.notify(SUBSCRIPTION_RECORDED, self.clock.as_ref());
        }
        self.policy_changes.notify_one();

        info!(
            insurance_id = %insurance.id,
            contract_number = %insurance.contract_number,
            insurance_type = %insurance.kind,
            "Subscription submitted"
        );
        insurance
    }

    pub async fn submit_support_ticket(&self, input: NewSupportTicket) -> SupportTicket {
        let now = self.clock.now();
        let ticket = SupportTicket {
            id: new_id(),
            kind: input.kind,
            contract_number: input.contract_number.filter(|n| !n.trim().is_empty()),
            message: input.message,
            attachments: input.attachments,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
            responses: Vec::new(),
        };

        let mut state = self.state.write().await;
        state.tickets.insert(0, ticket.clone());
        state.notify(SUPPORT_RECORDED, self.clock.as_ref());

        info!(ticket_id = %ticket.id, ticket_type = ?ticket.kind, "Support ticket submitted");
        ticket
    }

    /// Register document metadata. Documents do not raise a notification.
    pub async fn add_document(&self, input: NewDocument) -> Document {
        let document = Document {
            id: new_id(),
            name: input.name,
            category: input.category,
            url: input.url,
            size: input.size,
            size_label: human_size(input.size),
            created_at: self.clock.now(),
            contract_id: input.contract_id,
        };

        self.state.write().await.documents.insert(0, document.clone());

        info!(document_id = %document.id, category = ?document.category, "Document added");
        document
    }

    /// Unknown ids leave every collection untouched, notifications included
    pub async fn update_claim_status(&self, id: &str, status: ClaimStatus) -> Result<Claim> {
        let mut state = self.state.write().await;
        let claim = state
            .claims
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PortalError::not_found(Entity::Claim, id))?;

        claim.status = status;
        claim.updated_at = self.clock.now();
        let updated = claim.clone();

        state.notify(
            format!("Your claim status has been updated: {}", status),
            self.clock.as_ref(),
        );

        info!(claim_id = %id, status = %status, "Claim status updated");
        Ok(updated)
    }

    /// Contracts carry no `updatedAt`; only the status changes
    pub async fn update_insurance_status(
        &self,
        id: &str,
        status: ContractStatus,
    ) -> Result<Insurance> {
        let updated = {
            let mut state = self.state.write().await;
            let insurance = state
                .insurances
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| PortalError::not_found(Entity::Insurance, id))?;

            insurance.status = status;
            let updated = insurance.clone();

            state.notify(
                format!("Your contract status has been updated: {}", status),
                self.clock.as_ref(),
            );
            updated
        };
        self.policy_changes.notify_one();

        info!(insurance_id = %id, status = %status, "Contract status updated");
        Ok(updated)
    }

    pub async fn update_ticket_status(&self, id: &str, status: TicketStatus) -> Result<SupportTicket> {
        let mut state = self.state.write().await;
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PortalError::not_found(Entity::SupportTicket, id))?;

        ticket.status = status;
        ticket.updated_at = self.clock.now();

        info!(ticket_id = %id, status = ?status, "Support ticket status updated");
        Ok(ticket.clone())
    }

    pub async fn respond_to_ticket(
        &self,
        id: &str,
        message: impl Into<String>,
        is_agent: bool,
    ) -> Result<SupportResponse> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PortalError::not_found(Entity::SupportTicket, id))?;

        let response = SupportResponse {
            id: new_id(),
            message: message.into(),
            created_at: now,
            is_agent,
        };
        ticket.responses.push(response.clone());
        ticket.updated_at = now;

        info!(ticket_id = %id, response_id = %response.id, is_agent, "Support ticket answered");
        Ok(response)
    }

    /// Idempotent: marking an already read notification changes nothing
    pub async fn mark_notification_read(&self, id: &str) -> Result<Notification> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| PortalError::not_found(Entity::Notification, id))?;

        notification.read = true;
        debug!(notification_id = %id, "Notification marked as read");
        Ok(notification.clone())
    }

    /// Prepend a notice for every expiring policy whose message is not held yet.
    /// Returns the notifications inserted by this pass.
    pub async fn scan_expirations(&self) -> Vec<Notification> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let notices = expiring_policy_notices(&state.insurances, now);

        let mut inserted = Vec::new();
        for message in notices {
            if state.holds_message(&message) {
                continue;
            }
            inserted.push(state.notify(message, self.clock.as_ref()));
        }

        if !inserted.is_empty() {
            info!(count = inserted.len(), "Expiration notices added");
        }
        inserted
    }

    pub async fn settings(&self) -> Settings {
        self.state.read().await.settings.clone()
    }

    /// Replaces the whole record; no validation
    pub async fn update_settings(&self, settings: Settings) -> Settings {
        let mut state = self.state.write().await;
        state.settings = settings;
        info!(company_name = %state.settings.company_name, "Settings updated");
        state.settings.clone()
    }

    pub async fn claims(&self, query: &ClaimQuery) -> Vec<Claim> {
        query.apply(&self.state.read().await.claims)
    }

    pub async fn insurances(&self, query: &InsuranceQuery) -> Vec<Insurance> {
        query.apply(&self.state.read().await.insurances)
    }

    pub async fn tickets(&self, query: &TicketQuery) -> Vec<SupportTicket> {
        query.apply(&self.state.read().await.tickets)
    }

    pub async fn documents(&self, query: &DocumentQuery) -> Vec<Document> {
        query.apply(&self.state.read().await.documents)
    }

    pub async fn clients(&self, query: &ClientQuery) -> Vec<Client> {
        query.apply(&derive_clients(&self.state.read().await.insurances))
    }

    pub async fn policy_count(&self) -> usize {
        self.state.read().await.insurances.len()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn reports(&self) -> Reports {
        reports(&*self.state.read().await)
    }

    pub async fn admin_dashboard(&self) -> AdminDashboard {
        admin_dashboard(&*self.state.read().await)
    }

    pub async fn client_dashboard(&self) -> ClientDashboard {
        client_dashboard(&*self.state.read().await)
    }
}

impl Default for PortalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{DocumentCategory, InsuranceKind, TicketKind};
    use chrono::{Duration, TimeZone, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        ))
    }

    fn store_at(clock: Arc<ManualClock>) -> PortalStore {
        PortalStore::with_clock(clock)
    }

    fn flood_claim() -> NewClaim {
        NewClaim {
            kind: "home".to_string(),
            description: "flood".to_string(),
            date: "2024-01-01".to_string(),
        }
    }

    fn auto_policy(end_date: &str) -> NewInsurance {
        NewInsurance {
            kind: InsuranceKind::Auto,
            contract_number: None,
            start_date: "2023-06-01".to_string(),
            end_date: end_date.to_string(),
            premium: 480.0,
        }
    }

    #[tokio::test]
    async fn submit_claim_prepends_pending_claim_and_confirms() {
        let store = store_at(clock());
        let first = store.submit_claim(flood_claim()).await;
        let second = store.submit_claim(flood_claim()).await;

        let state = store.snapshot().await;
        assert_eq!(state.claims.len(), 2);
        assert_eq!(state.claims[0].id, second.id);
        assert_eq!(state.claims[1].id, first.id);
        assert_eq!(state.claims[0].status, ClaimStatus::Pending);
        assert!(state.claims[0].documents.is_empty());
        assert_eq!(state.claims[0].created_at, state.claims[0].updated_at);

        assert_eq!(state.notifications.len(), 2);
        assert_eq!(state.notifications[0].message, CLAIM_RECORDED);
        assert!(!state.notifications[0].read);
    }

    #[tokio::test]
    async fn submit_insurance_forces_pending_and_generates_contract_number() {
        let store = store_at(clock());
        let policy = store.submit_insurance(auto_policy("2025-06-01")).await;

        assert_eq!(policy.status, ContractStatus::Pending);
        assert!(policy.documents.is_empty());
        assert_eq!(policy.contract_number.len(), CONTRACT_NUMBER_LEN);
        assert!(
            policy
                .contract_number
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );

        let mut given = auto_policy("2025-06-01");
        given.contract_number = Some("AUTO-001".to_string());
        let policy = store.submit_insurance(given).await;
        assert_eq!(policy.contract_number, "AUTO-001");

        let state = store.snapshot().await;
        assert_eq!(state.insurances[0].id, policy.id);
        assert_eq!(state.notifications[0].message, SUBSCRIPTION_RECORDED);
    }

    #[tokio::test]
    async fn submit_ticket_opens_with_no_responses() {
        let store = store_at(clock());
        let ticket = store
            .submit_support_ticket(NewSupportTicket {
                kind: TicketKind::Complaint,
                contract_number: Some(String::new()),
                message: "Refund still missing".to_string(),
                attachments: vec![],
            })
            .await;

        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.responses.is_empty());
        assert_eq!(ticket.contract_number, None);

        let state = store.snapshot().await;
        assert_eq!(state.tickets[0].id, ticket.id);
        assert_eq!(state.notifications[0].message, SUPPORT_RECORDED);
    }

    #[tokio::test]
    async fn update_claim_status_touches_only_the_target() {
        let clock = clock();
        let store = store_at(clock.clone());
        let target = store.submit_claim(flood_claim()).await;
        let sibling = store.submit_claim(flood_claim()).await;

        clock.advance(Duration::hours(3));
        let updated = store
            .update_claim_status(&target.id, ClaimStatus::Resolved)
            .await
            .unwrap();

        assert_eq!(updated.status, ClaimStatus::Resolved);
        assert_eq!(updated.updated_at, target.created_at + Duration::hours(3));
        assert_eq!(updated.description, target.description);
        assert_eq!(updated.created_at, target.created_at);

        let state = store.snapshot().await;
        let untouched = state.claims.iter().find(|c| c.id == sibling.id).unwrap();
        assert_eq!(untouched, &sibling);
        assert_eq!(
            state.notifications[0].message,
            "Your claim status has been updated: resolved"
        );
    }

    #[tokio::test]
    async fn update_claim_status_on_unknown_id_is_not_found_and_silent() {
        let store = store_at(clock());
        store.submit_claim(flood_claim()).await;
        let before = store.snapshot().await;

        let err = store
            .update_claim_status("nonexistent", ClaimStatus::Resolved)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortalError::NotFound {
                entity: Entity::Claim,
                ..
            }
        ));

        let after = store.snapshot().await;
        assert_eq!(after.claims, before.claims);
        assert_eq!(after.notifications, before.notifications);
    }

    #[tokio::test]
    async fn update_insurance_status_keeps_other_fields() {
        let store = store_at(clock());
        let policy = store.submit_insurance(auto_policy("2025-06-01")).await;

        let updated = store
            .update_insurance_status(&policy.id, ContractStatus::Active)
            .await
            .unwrap();
        assert_eq!(updated.status, ContractStatus::Active);
        assert_eq!(updated.end_date, policy.end_date);

        assert!(
            store
                .update_insurance_status("missing", ContractStatus::Cancelled)
                .await
                .is_err()
        );
        let state = store.snapshot().await;
        assert_eq!(
            state.notifications[0].message,
            "Your contract status has been updated: active"
        );
    }

    #[tokio::test]
    async fn mark_notification_read_is_idempotent() {
        let store = store_at(clock());
        store.submit_claim(flood_claim()).await;
        let id = store.notifications().await[0].id.clone();

        store.mark_notification_read(&id).await.unwrap();
        let once = store.snapshot().await.notifications;
        store.mark_notification_read(&id).await.unwrap();
        let twice = store.snapshot().await.notifications;

        assert_eq!(once, twice);
        assert!(once[0].read);
        assert_eq!(store.unread_count().await, 0);
        assert!(store.mark_notification_read("missing").await.is_err());
    }

    #[tokio::test]
    async fn scan_adds_one_notice_for_a_policy_expiring_in_ten_days() {
        let clock = clock();
        let store = store_at(clock.clone());
        let end = (clock.now() + Duration::days(10)).format("%Y-%m-%d").to_string();
        store.submit_insurance(auto_policy(&end)).await;
        store.submit_insurance(auto_policy("2030-01-01")).await;

        let inserted = store.scan_expirations().await;
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].message, "Your auto insurance expires on 11/06/2024");
        assert!(!inserted[0].read);

        let notifications = store.notifications().await;
        assert_eq!(notifications[0], inserted[0]);
        let expiring: Vec<_> = notifications
            .iter()
            .filter(|n| n.message.contains("expires"))
            .collect();
        assert_eq!(expiring.len(), 1);
    }

    #[tokio::test]
    async fn repeated_scans_do_not_duplicate_even_after_read() {
        let store = store_at(clock());
        store.submit_insurance(auto_policy("2024-06-20")).await;
        store.submit_insurance(auto_policy("2024-05-01")).await;

        assert_eq!(store.scan_expirations().await.len(), 2);
        let count = store.notifications().await.len();

        let first = store.notifications().await[0].id.clone();
        store.mark_notification_read(&first).await.unwrap();

        assert!(store.scan_expirations().await.is_empty());
        assert_eq!(store.notifications().await.len(), count);
    }

    #[tokio::test]
    async fn same_type_and_end_date_collide_on_one_notice() {
        let store = store_at(clock());
        store.submit_insurance(auto_policy("2024-06-20")).await;
        store.submit_insurance(auto_policy("2024-06-20")).await;

        assert_eq!(store.scan_expirations().await.len(), 1);
    }

    #[tokio::test]
    async fn ticket_responses_and_status_bump_updated_at() {
        let clock = clock();
        let store = store_at(clock.clone());
        let ticket = store
            .submit_support_ticket(NewSupportTicket {
                kind: TicketKind::Question,
                contract_number: Some("AB12".to_string()),
                message: "Does my home policy cover hail?".to_string(),
                attachments: vec![],
            })
            .await;

        clock.advance(Duration::minutes(5));
        let response = store
            .respond_to_ticket(&ticket.id, "Yes, up to the ceiling.", true)
            .await
            .unwrap();
        assert!(response.is_agent);

        clock.advance(Duration::minutes(5));
        let closed = store
            .update_ticket_status(&ticket.id, TicketStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(closed.responses, vec![response]);
        assert_eq!(closed.updated_at, ticket.created_at + Duration::minutes(10));
        assert!(closed.updated_at >= closed.created_at);

        assert!(store.respond_to_ticket("missing", "hello", false).await.is_err());
    }

    #[tokio::test]
    async fn documents_and_settings() {
        let store = store_at(clock());
        let doc = store
            .add_document(NewDocument {
                name: "Attestation 2024.pdf".to_string(),
                category: DocumentCategory::Certificates,
                url: "/docs/attestation.pdf".to_string(),
                size: 2048,
                contract_id: None,
            })
            .await;

        let state = store.snapshot().await;
        assert_eq!(state.documents[0].id, doc.id);
        assert!(state.notifications.is_empty());
        assert_eq!(doc.size_label, "2 KB");

        assert_eq!(store.settings().await, Settings::default());
        let mut settings = Settings::default();
        settings.company_name = "Assur+".to_string();
        settings.auto_renewal = false;
        assert_eq!(store.update_settings(settings.clone()).await, settings);
        assert_eq!(store.settings().await, settings);
    }

    #[tokio::test]
    async fn policy_changes_are_signalled() {
        let store = store_at(clock());
        let changes = store.policy_changes();

        let policy = store.submit_insurance(auto_policy("2025-01-01")).await;
        tokio::time::timeout(std::time::Duration::from_secs(1), changes.notified())
            .await
            .unwrap();

        store
            .update_insurance_status(&policy.id, ContractStatus::Active)
            .await
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), changes.notified())
            .await
            .unwrap();
    }
}
