//! Filter and sort shared by every list view.
//!
//! A view composes a case-insensitive substring search over the record's
//! searchable fields with an exact status filter (or `all`), then optionally
//! sorts on one key. Sorting is stable, so records that compare equal keep
//! the collection order (most recent first for the store's collections).

use serde::de::{Deserializer, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{Claim, Document, DocumentCategory, Insurance, SupportTicket, parse_portal_date};
use crate::model::{ClaimStatus, ContractStatus, TicketStatus};

/// A record that can be listed through [`ListQuery`]
pub trait Listable {
    /// Value matched by the status filter
    type Status: PartialEq + Copy;
    /// Columns the view can sort on
    type SortKey: PartialEq + Copy;

    fn search_fields(&self) -> Vec<&str>;

    fn status(&self) -> Self::Status;

    fn compare_by(&self, other: &Self, key: Self::SortKey) -> Ordering;
}

/// Exact status match, or everything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S> Default for StatusFilter<S> {
    fn default() -> Self {
        StatusFilter::All
    }
}

impl<S: PartialEq> StatusFilter<S> {
    pub fn matches(&self, status: &S) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl<'de, S> Deserialize<'de> for StatusFilter<S>
where
    S: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        let de: serde::de::value::StringDeserializer<D::Error> = raw.into_deserializer();
        S::deserialize(de).map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: PartialEq + Copy> SortSpec<K> {
    pub fn ascending(key: K) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }

    /// Clicking a column header: same key flips the direction, a new key
    /// starts ascending.
    pub fn toggle(self, key: K) -> Self {
        if self.key == key {
            Self {
                key,
                direction: self.direction.reversed(),
            }
        } else {
            Self::ascending(key)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListQuery<S, K> {
    pub search: String,
    pub status: StatusFilter<S>,
    pub sort: Option<SortSpec<K>>,
}

impl<S, K> Default for ListQuery<S, K> {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            sort: None,
        }
    }
}

impl<S: PartialEq + Copy, K: PartialEq + Copy> ListQuery<S, K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn status(mut self, status: S) -> Self {
        self.status = StatusFilter::Only(status);
        self
    }

    pub fn sort_by(mut self, key: K, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec { key, direction });
        self
    }

    pub fn matches<T>(&self, item: &T) -> bool
    where
        T: Listable<Status = S, SortKey = K>,
    {
        let needle = self.search.trim().to_lowercase();
        let matches_search = needle.is_empty()
            || item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));

        matches_search && self.status.matches(&item.status())
    }

    pub fn apply<T>(&self, items: &[T]) -> Vec<T>
    where
        T: Listable<Status = S, SortKey = K> + Clone,
    {
        let mut selected: Vec<T> = items.iter().filter(|item| self.matches(*item)).cloned().collect();

        if let Some(spec) = self.sort {
            // sort_by is stable: ties keep collection order in both directions
            selected.sort_by(|a, b| {
                let ordering = a.compare_by(b, spec.key);
                match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        selected
    }
}

/// Unparseable dates sort before every valid one
fn compare_dates(a: &str, b: &str) -> Ordering {
    parse_portal_date(a).ok().cmp(&parse_portal_date(b).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClaimSortKey {
    CreatedAt,
    UpdatedAt,
    Date,
    Type,
    Status,
}

impl Listable for Claim {
    type Status = ClaimStatus;
    type SortKey = ClaimSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.kind.as_str(), self.description.as_str()]
    }

    fn status(&self) -> ClaimStatus {
        self.status
    }

    fn compare_by(&self, other: &Self, key: ClaimSortKey) -> Ordering {
        match key {
            ClaimSortKey::CreatedAt => self.created_at.cmp(&other.created_at),
            ClaimSortKey::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            ClaimSortKey::Date => compare_dates(&self.date, &other.date),
            ClaimSortKey::Type => self.kind.to_lowercase().cmp(&other.kind.to_lowercase()),
            ClaimSortKey::Status => self.status.cmp(&other.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsuranceSortKey {
    EndDate,
    StartDate,
    Premium,
    Type,
    ContractNumber,
    Status,
}

impl Listable for Insurance {
    type Status = ContractStatus;
    type SortKey = InsuranceSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.kind.as_str(), self.contract_number.as_str()]
    }

    fn status(&self) -> ContractStatus {
        self.status
    }

    fn compare_by(&self, other: &Self, key: InsuranceSortKey) -> Ordering {
        match key {
            InsuranceSortKey::EndDate => compare_dates(&self.end_date, &other.end_date),
            InsuranceSortKey::StartDate => compare_dates(&self.start_date, &other.start_date),
            InsuranceSortKey::Premium => self.premium.total_cmp(&other.premium),
            InsuranceSortKey::Type => self.kind.as_str().cmp(other.kind.as_str()),
            InsuranceSortKey::ContractNumber => self.contract_number.cmp(&other.contract_number),
            InsuranceSortKey::Status => self.status.cmp(&other.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TicketSortKey {
    CreatedAt,
    UpdatedAt,
    Status,
}

impl Listable for SupportTicket {
    type Status = TicketStatus;
    type SortKey = TicketSortKey;

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.message.as_str()];
        if let Some(contract) = &self.contract_number {
            fields.push(contract.as_str());
        }
        fields
    }

    fn status(&self) -> TicketStatus {
        self.status
    }

    fn compare_by(&self, other: &Self, key: TicketSortKey) -> Ordering {
        match key {
            TicketSortKey::CreatedAt => self.created_at.cmp(&other.created_at),
            TicketSortKey::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            TicketSortKey::Status => self.status.cmp(&other.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSortKey {
    Name,
    CreatedAt,
    Size,
}

impl Listable for Document {
    type Status = DocumentCategory;
    type SortKey = DocumentSortKey;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn status(&self) -> DocumentCategory {
        self.category
    }

    fn compare_by(&self, other: &Self, key: DocumentSortKey) -> Ordering {
        match key {
            DocumentSortKey::Name => self.name.to_lowercase().cmp(&other.name.to_lowercase()),
            DocumentSortKey::CreatedAt => self.created_at.cmp(&other.created_at),
            DocumentSortKey::Size => self.size.cmp(&other.size),
        }
    }
}

pub type ClaimQuery = ListQuery<ClaimStatus, ClaimSortKey>;
pub type InsuranceQuery = ListQuery<ContractStatus, InsuranceSortKey>;
pub type TicketQuery = ListQuery<TicketStatus, TicketSortKey>;
pub type DocumentQuery = ListQuery<DocumentCategory, DocumentSortKey>;
