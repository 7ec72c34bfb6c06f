use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Reservation request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Item id {id} not found")]
    ItemNotFound { id: String },

    #[error("Reservation rejected with status {status}: {body}")]
    ReservationRejected { status: u16, body: String },

    #[error("Invalid reservation response: {message}")]
    InvalidReservationResponse { message: String },

    #[error("Malformed stored data: {message}")]
    MalformedData { message: String },
}

impl CartError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CartError::ItemNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CartError>;
