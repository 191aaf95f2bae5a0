use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("The quote provider could not be reached or did not answer in time: {0}")]
    Unavailable(String),

    #[error("Failed to deserialize the quote response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from the quote provider: {0}")]
    InvalidData(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            QuoteError::Deserialization(err.to_string())
        } else {
            QuoteError::Unavailable(err.to_string())
        }
    }
}
