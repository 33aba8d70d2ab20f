use portal_core::{ListQuery, Notification, SortDirection, SortSpec, StatusFilter};
use serde::{Deserialize, Serialize};

/// Query string shared by every list endpoint:
/// `?search=flood&status=pending&sort=createdAt&direction=desc`
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>, K: Deserialize<'de>"))]
pub struct ListParams<S, K> {
    #[serde(default)]
    pub search: String,
    #[serde(default, alias = "category")]
    pub status: StatusFilter<S>,
    pub sort: Option<K>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl<S: PartialEq + Copy, K: PartialEq + Copy> ListParams<S, K> {
    pub fn into_query(self) -> ListQuery<S, K> {
        ListQuery {
            search: self.search,
            status: self.status,
            sort: self.sort.map(|key| SortSpec {
                key,
                direction: self.direction,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusUpdateRequest<S> {
    pub status: S,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponseRequest {
    pub message: String,
    /// Defaults to an agent reply, since the route lives in the admin portal
    #[serde(default)]
    pub is_agent: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}
