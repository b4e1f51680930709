use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    InsufficientData(String),

    #[error("Malformed numeric input: {0}")]
    MalformedInput(String),
}
