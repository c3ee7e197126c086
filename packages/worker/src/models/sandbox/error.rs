use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Empty command line")]
    EmptyCommand,
}
