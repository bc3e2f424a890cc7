pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown node shape: {shape} (expected square, circle, diamond, triangle-up or triangle-down)")]
    UnknownShape { shape: String },

    #[error("Invalid bowtie config: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid bowtie input document: {message}")]
    InvalidInput { message: String },
}
