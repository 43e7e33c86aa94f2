//! Editors provider selection.

use crate::remote::EditorsProviderDto;
use crate::session::SessionId;

/// Source of expression editors for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorsProvider {
    /// Resolved inside the frontend process.
    Local { file_type_id: String },
    /// Backed by the remote session.
    Remote {
        session: SessionId,
        file_type_id: String,
    },
}

impl EditorsProvider {
    /// Prefer the local provider when the backend reports one.
    pub fn resolve(session: SessionId, dto: &EditorsProviderDto) -> Self {
        if dto.local {
            Self::Local {
                file_type_id: dto.file_type_id.clone(),
            }
        } else {
            Self::Remote {
                session,
                file_type_id: dto.file_type_id.clone(),
            }
        }
    }

    pub fn file_type_id(&self) -> &str {
        match self {
            Self::Local { file_type_id } | Self::Remote { file_type_id, .. } => file_type_id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}
