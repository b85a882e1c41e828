//! Who may see and who may change an ad.
//!
//! Reads: anonymous viewers see active ads only; an authenticated viewer also
//! sees every ad they own, whatever its status. Writes are owner-only.

use uuid::Uuid;

use super::repo_types::{Ad, AdQuery};
use crate::error::AppError;
use crate::users::repo_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn can_view(&self, ad: &Ad) -> bool {
        ad.is_active || self.id() == Some(ad.owner_id)
    }

    /// Listing filter equivalent to `can_view`.
    pub fn visible(&self) -> AdQuery {
        AdQuery {
            viewer: self.id(),
            owner: None,
        }
    }
}

impl From<Option<&User>> for Viewer {
    fn from(user: Option<&User>) -> Self {
        match user {
            Some(u) => Viewer::User(u.id),
            None => Viewer::Anonymous,
        }
    }
}

pub const NOT_OWNER: &str = "You can only modify your own ads.";
pub const NOT_OWNER_UPLOAD: &str = "You can only upload images to your own ads.";
pub const NOT_OWNER_SOLD: &str = "You can only mark your own ads as sold.";

/// Owner-only mutation rule; `denied` is the message for other users.
pub fn ensure_owner(viewer: Viewer, ad: &Ad, denied: &str) -> Result<(), AppError> {
    match viewer {
        Viewer::Anonymous => Err(AppError::not_authenticated()),
        Viewer::User(id) if id == ad.owner_id => Ok(()),
        Viewer::User(_) => Err(AppError::Forbidden(denied.to_string())),
    }
}
