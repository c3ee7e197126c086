use common::Capability;
use tracing::info;

use crate::error::JudgeError;
use crate::model::User;
use crate::store::UserStore;

/// Partial update of a user's profile.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub library_url: Option<String>,
    pub is_admin: Option<bool>,
}

/// Apply `patch` to the named user.
///
/// Users may edit their own profile; only administrators may edit others or change admin
/// status.
pub async fn change_user_info<S>(
    store: &S,
    capability: &Capability,
    name: &str,
    patch: UserPatch,
) -> Result<User, JudgeError>
where
    S: UserStore + ?Sized,
{
    let mut user = store
        .get_user(name)
        .await?
        .ok_or_else(|| JudgeError::NotFound(format!("User '{name}' not found")))?;

    if !capability.is_admin() {
        if !capability.is_user(name) {
            return Err(JudgeError::PermissionDenied(
                "Cannot change another user's profile".into(),
            ));
        }
        if patch.is_admin.is_some() {
            return Err(JudgeError::PermissionDenied(
                "Only administrators can change admin status".into(),
            ));
        }
    }

    if let Some(url) = patch.library_url {
        user.library_url = if url.is_empty() { None } else { Some(url) };
    }
    if let Some(is_admin) = patch.is_admin {
        user.is_admin = is_admin;
    }

    store.save_user(&user).await?;
    info!(user = %user.name, by = ?capability.user_name(), "User updated");
    Ok(user)
}
