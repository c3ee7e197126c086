use judge::User;
use judge::account::UserPatch;
use serde::{Deserialize, Serialize};

/// Request body for `PATCH /users/{name}`. Absent fields are left unchanged.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct ChangeUserInfoRequest {
    /// Library repository URL. An empty string clears it.
    #[schema(example = "https://github.com/alice/library")]
    pub library_url: Option<String>,
    /// Administrators only.
    pub is_admin: Option<bool>,
}

impl From<ChangeUserInfoRequest> for UserPatch {
    fn from(req: ChangeUserInfoRequest) -> Self {
        Self {
            library_url: req.library_url,
            is_admin: req.is_admin,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = "alice")]
    pub name: String,
    pub is_admin: bool,
    pub library_url: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            is_admin: u.is_admin,
            library_url: u.library_url,
        }
    }
}
