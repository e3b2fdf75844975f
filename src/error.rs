use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnnulusError>;

#[derive(Error, Debug)]
pub enum AnnulusError {
    /// Malformed configuration, geometry or material
    #[error("Input error: {0}")]
    Input(String),

    /// Degenerate or unsupported mesh data
    #[error("Topology error: {0}")]
    Topology(String),

    /// The assembled system could not be factored
    #[error("Solver error: singular system: {0}")]
    SingularSystem(String),

    #[error("Post Processor error: {0}")]
    PostProcessor(String),
}
