use std::thread;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use petal_contracts::models::ApiConfig;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{AiError, AiResult};
use crate::{endpoint_url, truncate_text, REQUEST_TIMEOUT};

pub const DASHSCOPE_SYNTHESIS_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text2image/image-synthesis";
pub const DASHSCOPE_TASKS_BASE: &str = "https://dashscope.aliyuncs.com/api/v1/tasks";

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_ATTEMPTS: u32 = 30;

/// How the configured backend accepts an image request. Picked once at
/// dispatcher construction; every call reuses the stored variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// OpenAI-compatible `/images/generations`, one request/response.
    Synchronous,
    /// DashScope wanx models: submit a task, then poll its status.
    AsyncPoll,
    /// OpenRouter: a chat completion with image+text modalities.
    ChatModality,
}

impl ImageStrategy {
    pub fn detect(config: &ApiConfig) -> Self {
        if config.image_model.to_lowercase().contains("wanx") {
            return ImageStrategy::AsyncPoll;
        }
        let endpoint = config
            .image_endpoint
            .as_deref()
            .unwrap_or(&config.endpoint);
        if endpoint.contains("openrouter") {
            return ImageStrategy::ChatModality;
        }
        ImageStrategy::Synchronous
    }
}

/// Calls the configured image backend and normalizes whatever comes back to a
/// single reference string: a hosted URL or a data URI.
pub struct ImageDispatcher {
    config: ApiConfig,
    strategy: ImageStrategy,
    http: HttpClient,
}

impl ImageDispatcher {
    pub fn new(config: ApiConfig) -> AiResult<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::MissingCredential);
        }
        let strategy = ImageStrategy::detect(&config);
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            config,
            strategy,
            http,
        })
    }

    pub fn strategy(&self) -> ImageStrategy {
        self.strategy
    }

    pub fn generate(&self, prompt: &str) -> AiResult<String> {
        debug!(
            strategy = ?self.strategy,
            model = %self.config.image_model,
            "generating preview image"
        );
        match self.strategy {
            ImageStrategy::Synchronous => self.generate_sync(prompt),
            ImageStrategy::AsyncPoll => self.generate_async(prompt),
            ImageStrategy::ChatModality => self.generate_chat_modality(prompt),
        }
    }

    /// Resolves a reference from `generate` into raw image bytes and checks
    /// they actually decode as an image.
    pub fn fetch_image_bytes(&self, reference: &str) -> AiResult<Vec<u8>> {
        let trimmed = reference.trim();
        let bytes = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let response = self.http.get(trimmed).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(AiError::Provider(status.as_u16()));
            }
            response.bytes()?.to_vec()
        } else {
            decode_reference_bytes(trimmed).ok_or(AiError::ImageDecode)?
        };
        image::load_from_memory(&bytes).map_err(|_| AiError::ImageDecode)?;
        Ok(bytes)
    }

    fn generate_sync(&self, prompt: &str) -> AiResult<String> {
        let base = self
            .config
            .image_endpoint
            .as_deref()
            .unwrap_or(&self.config.endpoint);
        let url = endpoint_url(base, "images/generations")?;
        let payload = json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;
        let body = read_success_json(response)?;
        sync_image_reference(&body).ok_or(AiError::ImageParse)
    }

    fn generate_async(&self, prompt: &str) -> AiResult<String> {
        let payload = json!({
            "model": self.config.image_model,
            "input": {"prompt": prompt},
            "parameters": {"size": "1024*1024", "n": 1},
        });
        let response = self
            .http
            .post(DASHSCOPE_SYNTHESIS_ENDPOINT)
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&payload)
            .send()?;
        let submitted = read_success_json(response)?;
        let task_id = submitted
            .get("output")
            .and_then(|output| output.get("task_id"))
            .and_then(Value::as_str)
            .ok_or(AiError::ImageParse)?
            .to_string();
        debug!(task_id = %task_id, "image synthesis task submitted");

        run_poll_loop(POLL_ATTEMPTS, POLL_INTERVAL, || self.fetch_task(&task_id))
    }

    fn fetch_task(&self, task_id: &str) -> AiResult<TaskPoll> {
        let url = format!("{DASHSCOPE_TASKS_BASE}/{task_id}");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()?;
        let body = read_success_json(response)?;
        Ok(task_poll(&body))
    }

    fn generate_chat_modality(&self, prompt: &str) -> AiResult<String> {
        let url = endpoint_url(&self.config.endpoint, "chat/completions")?;
        let payload = json!({
            "model": self.config.image_model,
            "messages": [{"role": "user", "content": prompt}],
            "modalities": ["image", "text"],
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", "https://petal.app")
            .header("X-Title", "Petal")
            .json(&payload)
            .send()?;
        let body = read_success_json(response)?;
        extract_image_reference(&body).ok_or(AiError::ImageParse)
    }
}

fn read_success_json(response: HttpResponse) -> AiResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        warn!(
            status = status.as_u16(),
            body = %truncate_text(&body, 512),
            "image provider returned an error"
        );
        return Err(AiError::Provider(status.as_u16()));
    }
    response.json().map_err(|_| AiError::ImageParse)
}

/// `/images/generations` answer: a hosted URL when present, otherwise the
/// inline base64 payload rendered as a data URI.
fn sync_image_reference(payload: &Value) -> Option<String> {
    let first = payload.get("data")?.get(0)?;
    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Some(url.to_string());
    }
    first
        .get("b64_json")
        .and_then(Value::as_str)
        .map(|b64| format!("data:image/png;base64,{b64}"))
}

#[derive(Debug, Clone, PartialEq)]
enum TaskPoll {
    Succeeded(String),
    Failed(String),
    InProgress,
}

fn task_poll(payload: &Value) -> TaskPoll {
    let output = payload.get("output");
    let status = output
        .and_then(|output| output.get("task_status"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    match status {
        "SUCCEEDED" => {
            let url = output
                .and_then(|output| output.get("results"))
                .and_then(|results| results.get(0))
                .and_then(|row| row.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            TaskPoll::Succeeded(url.to_string())
        }
        "FAILED" => TaskPoll::Failed(truncate_text(&payload.to_string(), 256)),
        // PENDING / RUNNING / anything unrecognized keeps polling.
        _ => TaskPoll::InProgress,
    }
}

/// Fixed-cadence poll: sleep, fetch, decide; no backoff and no cancellation.
/// Exhausting the attempt budget is a timeout.
fn run_poll_loop(
    attempts: u32,
    interval: Duration,
    mut fetch: impl FnMut() -> AiResult<TaskPoll>,
) -> AiResult<String> {
    for _ in 0..attempts {
        thread::sleep(interval);
        match fetch()? {
            TaskPoll::Succeeded(url) => return Ok(url),
            TaskPoll::Failed(detail) => return Err(AiError::GenerationFailed(detail)),
            TaskPoll::InProgress => {}
        }
    }
    Err(AiError::Timeout)
}

/// Chat-modality answers vary by model; each extractor handles one known
/// shape and the first hit wins.
fn extract_image_reference(payload: &Value) -> Option<String> {
    let message = payload.get("choices")?.get(0)?.get("message")?;
    EXTRACTORS.iter().find_map(|extract| extract(message))
}

const EXTRACTORS: &[fn(&Value) -> Option<String>] = &[
    extract_nested_image_url,
    extract_image_string_array,
    extract_markdown_image,
    extract_bare_reference,
];

fn extract_nested_image_url(message: &Value) -> Option<String> {
    message
        .get("images")?
        .get(0)?
        .get("image_url")?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

fn extract_image_string_array(message: &Value) -> Option<String> {
    message.get("images")?.get(0)?.as_str().map(str::to_string)
}

fn extract_markdown_image(message: &Value) -> Option<String> {
    let content = message.get("content")?.as_str()?;
    let start = content.find("![")?;
    let open = content[start..].find("](")? + start + 2;
    let close = content[open..].find(')')? + open;
    let url = content[open..close].trim();
    if url.is_empty() {
        return None;
    }
    Some(url.to_string())
}

fn extract_bare_reference(message: &Value) -> Option<String> {
    let content = message.get("content")?.as_str()?.trim();
    if content.starts_with("http") || content.starts_with("data:image") {
        return Some(content.to_string());
    }
    None
}

fn decode_reference_bytes(reference: &str) -> Option<Vec<u8>> {
    let payload = if reference.starts_with("data:image") {
        reference.split_once(',').map(|(_, rest)| rest)?
    } else {
        reference
    };
    BASE64.decode(payload.trim().as_bytes()).ok()
}

/// Extension for saving fetched preview bytes, from the payload's magic
/// numbers.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::WebP) => "webp",
        _ => "png",
    }
}
