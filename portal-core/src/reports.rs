//! Read-only views computed from the store: statistics, dashboards and the
//! client list derived from contracts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{Claim, ClaimStatus, ContractStatus, Insurance, TicketStatus, parse_portal_date};
use crate::query::{ListQuery, Listable};
use crate::store::PortalState;

const CLIENT_RECENT_CLAIMS: usize = 3;
const ADMIN_RECENT_CLAIMS: usize = 5;

/// Percentage with one decimal, 0 for an empty collection
fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub resolved: usize,
    pub rejected: usize,
    pub resolution_rate: f64,
}

impl ClaimStats {
    pub fn from_claims(claims: &[Claim]) -> Self {
        let count = |status: ClaimStatus| claims.iter().filter(|c| c.status == status).count();
        let resolved = count(ClaimStatus::Resolved);

        Self {
            total: claims.len(),
            pending: count(ClaimStatus::Pending),
            processing: count(ClaimStatus::Processing),
            resolved,
            rejected: count(ClaimStatus::Rejected),
            resolution_rate: rate(resolved, claims.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub expired: usize,
    pub cancelled: usize,
    pub active_rate: f64,
}

impl ContractStats {
    pub fn from_insurances(insurances: &[Insurance]) -> Self {
        let count = |status: ContractStatus| insurances.iter().filter(|i| i.status == status).count();
        let active = count(ContractStatus::Active);

        Self {
            total: insurances.len(),
            active,
            pending: count(ContractStatus::Pending),
            expired: count(ContractStatus::Expired),
            cancelled: count(ContractStatus::Cancelled),
            active_rate: rate(active, insurances.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
    pub resolution_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reports {
    pub claims: ClaimStats,
    pub contracts: ContractStats,
    pub support: SupportStats,
}

pub fn reports(state: &PortalState) -> Reports {
    let count = |status: TicketStatus| state.tickets.iter().filter(|t| t.status == status).count();
    let resolved = count(TicketStatus::Resolved);

    Reports {
        claims: ClaimStats::from_claims(&state.claims),
        contracts: ContractStats::from_insurances(&state.insurances),
        support: SupportStats {
            total: state.tickets.len(),
            open: count(TicketStatus::Open),
            in_progress: count(TicketStatus::InProgress),
            resolved,
            closed: count(TicketStatus::Closed),
            resolution_rate: rate(resolved, state.tickets.len()),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub pending_claims: usize,
    pub pending_subscriptions: usize,
    pub open_tickets: usize,
    pub active_contracts: usize,
    pub recent_claims: Vec<Claim>,
}

pub fn admin_dashboard(state: &PortalState) -> AdminDashboard {
    let mut recent_claims = state.claims.clone();
    recent_claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_claims.truncate(ADMIN_RECENT_CLAIMS);

    AdminDashboard {
        pending_claims: state
            .claims
            .iter()
            .filter(|c| c.status == ClaimStatus::Pending)
            .count(),
        pending_subscriptions: state
            .insurances
            .iter()
            .filter(|i| i.status == ContractStatus::Pending)
            .count(),
        open_tickets: state
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open)
            .count(),
        active_contracts: state
            .insurances
            .iter()
            .filter(|i| i.status == ContractStatus::Active)
            .count(),
        recent_claims,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub stats: ClaimStats,
    pub recent_claims: Vec<Claim>,
    pub has_more_claims: bool,
    pub policies: Vec<Insurance>,
}

pub fn client_dashboard(state: &PortalState) -> ClientDashboard {
    ClientDashboard {
        stats: ClaimStats::from_claims(&state.claims),
        recent_claims: state.claims.iter().take(CLIENT_RECENT_CLAIMS).cloned().collect(),
        has_more_claims: state.claims.len() > CLIENT_RECENT_CLAIMS,
        policies: state.insurances.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
}

/// A client as seen from the admin portal: one per contract number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contract_number: String,
    pub insurances: Vec<Insurance>,
    pub status: ClientStatus,
    pub join_date: String,
}

/// Group contracts by contract number, in first-seen order
pub fn derive_clients(insurances: &[Insurance]) -> Vec<Client> {
    let mut clients: Vec<Client> = Vec::new();

    for insurance in insurances {
        match clients
            .iter_mut()
            .find(|c| c.contract_number == insurance.contract_number)
        {
            Some(client) => client.insurances.push(insurance.clone()),
            None => clients.push(Client {
                id: format!("client-{}", insurance.contract_number),
                name: format!("Client {}", insurance.contract_number),
                email: format!("client{}@example.com", insurance.contract_number),
                contract_number: insurance.contract_number.clone(),
                insurances: vec![insurance.clone()],
                status: ClientStatus::Inactive,
                join_date: insurance.start_date.clone(),
            }),
        }
    }

    for client in &mut clients {
        if client
            .insurances
            .iter()
            .any(|i| i.status == ContractStatus::Active)
        {
            client.status = ClientStatus::Active;
        }
    }

    clients
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientSortKey {
    Name,
    JoinDate,
}

impl Listable for Client {
    type Status = ClientStatus;
    type SortKey = ClientSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn status(&self) -> ClientStatus {
        self.status
    }

    fn compare_by(&self, other: &Self, key: ClientSortKey) -> Ordering {
        match key {
            ClientSortKey::Name => self.name.cmp(&other.name),
            ClientSortKey::JoinDate => parse_portal_date(&self.join_date)
                .ok()
                .cmp(&parse_portal_date(&other.join_date).ok()),
        }
    }
}

pub type ClientQuery = ListQuery<ClientStatus, ClientSortKey>;
