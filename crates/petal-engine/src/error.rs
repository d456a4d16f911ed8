use thiserror::Error;

/// Everything the engine can surface to the calling UI. Nothing here is
/// retried; one failed attempt ends the operation.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key is configured; add one in settings")]
    MissingCredential,

    #[error("configured endpoint is not a valid URL: {0}")]
    InvalidEndpoint(String),

    #[error("provider request failed with status {0}")]
    Provider(u16),

    #[error("model response did not match the expected plan shape: {0}")]
    ResponseParse(String),

    #[error("image response carried no recognizable image payload")]
    ImageParse,

    #[error("image generation task failed: {0}")]
    GenerationFailed(String),

    #[error("image generation timed out while polling the task")]
    Timeout,

    #[error("payload was not a decodable image")]
    ImageDecode,

    #[error("request transport failed")]
    Transport(#[from] reqwest::Error),
}

pub type AiResult<T> = Result<T, AiError>;
