pub mod error;
pub mod image;
pub mod planner;
pub mod workflow;

pub use error::{AiError, AiResult};
pub use image::{ImageDispatcher, ImageStrategy};
pub use planner::DesignPlanner;
pub use workflow::{attach_preview, generate_with_preview};

use std::time::Duration;

/// Explicit request timeout for every external call; the transport default
/// would otherwise be unbounded.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn endpoint_url(base: &str, path: &str) -> AiResult<String> {
    let url = format!("{}/{}", base.trim_end_matches('/'), path);
    reqwest::Url::parse(&url).map_err(|_| AiError::InvalidEndpoint(url.clone()))?;
    Ok(url)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
