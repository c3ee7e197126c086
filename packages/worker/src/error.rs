use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Language registry error: {0}")]
    Language(#[from] common::language::LanguageError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
