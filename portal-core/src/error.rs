use thiserror::Error;

/// Kind of record a lookup was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Claim,
    Insurance,
    SupportTicket,
    Notification,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Claim => "claim",
            Entity::Insurance => "insurance",
            Entity::SupportTicket => "support ticket",
            Entity::Notification => "notification",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl PortalError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        PortalError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
