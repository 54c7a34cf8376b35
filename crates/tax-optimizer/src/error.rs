use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaxError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown state code: {0}")]
    UnknownStateCode(String),

    #[error("No investor profile has been configured")]
    MissingProfile,
}

pub type TaxResult<T> = Result<T, TaxError>;
