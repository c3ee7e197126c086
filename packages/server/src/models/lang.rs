use common::Language;
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct LangResponse {
    #[schema(example = "cpp")]
    pub id: String,
    #[schema(example = "C++")]
    pub name: String,
    #[schema(example = "GCC 13 (C++20)")]
    pub version: String,
}

impl From<&Language> for LangResponse {
    fn from(l: &Language) -> Self {
        Self {
            id: l.id.clone(),
            name: l.name.clone(),
            version: l.version.clone(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LangListResponse {
    pub langs: Vec<LangResponse>,
}
