use lek_codec::CodecError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single raw record that could not be turned into a typed record. The record is dropped and
/// the rest of the batch is still delivered.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("record does not match the source schema: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("message body does not decode into the registered type: {0}")]
    Body(#[source] serde_json::Error),

    #[error("stream image does not decode into the registered type: {0}")]
    Image(#[source] CodecError),
}

/// The payload as a whole is not a record batch. Treated as a batch of zero records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadShapeError {
    #[error("payload has no top-level `Records` array")]
    MissingRecords,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registered handler failed; surfaced unchanged so the host can retry or redrive.
    #[error("handler for source `{source_name}` failed")]
    Handler {
        source_name: String,
        #[source]
        error: BoxError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("a handler is already registered for source `{0}`")]
    DuplicateSource(String),
}
