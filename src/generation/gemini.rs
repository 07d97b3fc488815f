//! Generative Language batch API client.
//!
//! Submission inlines every prompt in a single `batchGenerateContent` call;
//! each request asks for text and image modalities and carries a
//! `request-<i>` key. Status polling reads the operation resource and, once
//! it has succeeded, extracts the first inline image of each response in
//! order.

use super::backend::{GenerationBackend, GenerationError, JobId, JobState, JobStatus, OutputItem};
use crate::config::RenderConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::{Client, Response};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiBackend {
    client: Client,
    api_base: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_base: &str, api_key: String) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build a client from render settings, reading the key from the
    /// configured environment variable.
    pub fn from_config(render: &RenderConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&render.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(render.api_key_env.clone()))?;
        Self::new(&render.api_base, api_key)
    }

    fn read_json(response: Response) -> Result<Value, GenerationError> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl GenerationBackend for GeminiBackend {
    fn submit(&self, model: &str, prompts: &[String]) -> Result<JobId, GenerationError> {
        let url = format!("{}/models/{}:batchGenerateContent", self.api_base, model);
        debug!(%url, prompts = prompts.len(), "submitting batch");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&submit_body(prompts))
            .send()?;
        let body = Self::read_json(response)?;
        body.get("name")
            .and_then(Value::as_str)
            .map(|name| JobId(name.to_string()))
            .ok_or_else(|| GenerationError::MalformedResponse("submission has no job name".into()))
    }

    fn status(&self, job: &JobId) -> Result<JobStatus, GenerationError> {
        let url = format!("{}/{}", self.api_base, job);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;
        parse_status(&Self::read_json(response)?)
    }
}

/// Request body for a batch of inlined prompts.
pub fn submit_body(prompts: &[String]) -> Value {
    let requests: Vec<Value> = prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            json!({
                "request": {
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
                },
                "metadata": { "key": format!("request-{i}") }
            })
        })
        .collect();
    json!({
        "batch": {
            "display_name": "comic-factory",
            "input_config": { "requests": { "requests": requests } }
        }
    })
}

/// Interpret a batch operation resource.
pub fn parse_status(body: &Value) -> Result<JobStatus, GenerationError> {
    let name = body
        .pointer("/metadata/state")
        .or_else(|| body.get("state"))
        .and_then(Value::as_str)
        .ok_or_else(|| GenerationError::MalformedResponse("no job state".into()))?;
    let state =
        JobState::from_api_name(name).ok_or_else(|| GenerationError::UnknownState(name.into()))?;

    let mut status = JobStatus::new(state);
    status.error = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if state == JobState::Succeeded {
        let responses = body
            .pointer("/response/inlinedResponses/inlinedResponses")
            .or_else(|| body.pointer("/metadata/output/inlinedResponses/inlinedResponses"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("succeeded job has no inlined responses".into())
            })?;
        status.items = responses
            .iter()
            .map(parse_item)
            .collect::<Result<_, _>>()?;
    }
    Ok(status)
}

fn parse_item(item: &Value) -> Result<OutputItem, GenerationError> {
    let parts = item
        .pointer("/response/candidates/0/content/parts")
        .and_then(Value::as_array);
    let inline = parts.and_then(|parts| {
        parts
            .iter()
            .find_map(|p| p.get("inlineData").or_else(|| p.get("inline_data")))
    });
    let Some(inline) = inline else {
        return Ok(OutputItem::empty());
    };

    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| GenerationError::MalformedResponse("inline image without data".into()))?;
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| GenerationError::MalformedResponse(format!("image data: {e}")))?;
    let mime = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .unwrap_or("image/png");
    Ok(OutputItem::image(bytes, mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_item(data: &str) -> Value {
        json!({
            "response": { "candidates": [{ "content": { "parts": [
                { "text": "here you go" },
                { "inlineData": { "mimeType": "image/jpeg", "data": data } }
            ]}}]},
            "metadata": { "key": "request-0" }
        })
    }

    #[test]
    fn submit_body_inlines_each_prompt_with_key() {
        let body = submit_body(&["one".into(), "two".into()]);
        let requests = body
            .pointer("/batch/input_config/requests/requests")
            .and_then(Value::as_array)
            .unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].pointer("/request/contents/0/parts/0/text"),
            Some(&json!("two"))
        );
        assert_eq!(requests[1].pointer("/metadata/key"), Some(&json!("request-1")));
        assert_eq!(
            requests[0].pointer("/request/generationConfig/responseModalities"),
            Some(&json!(["TEXT", "IMAGE"]))
        );
    }

    #[test]
    fn running_job_has_no_items() {
        let status = parse_status(&json!({ "metadata": { "state": "BATCH_STATE_RUNNING" } })).unwrap();
        assert_eq!(status.state, JobState::Submitted);
        assert!(status.items.is_empty());
    }

    #[test]
    fn top_level_state_is_accepted() {
        let status = parse_status(&json!({ "state": "JOB_STATE_PENDING" })).unwrap();
        assert_eq!(status.state, JobState::Submitted);
    }

    #[test]
    fn succeeded_job_decodes_images_in_order() {
        let body = json!({
            "metadata": { "state": "BATCH_STATE_SUCCEEDED" },
            "response": { "inlinedResponses": { "inlinedResponses": [
                image_item("aGVsbG8="),
                { "error": { "message": "blocked" } },
                image_item("d29ybGQ=")
            ]}}
        });
        let status = parse_status(&body).unwrap();

        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(status.items.len(), 3);
        assert_eq!(status.items[0].image.as_deref(), Some(&b"hello"[..]));
        assert_eq!(status.items[0].mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(status.items[1].image, None);
        assert_eq!(status.items[2].image.as_deref(), Some(&b"world"[..]));
    }

    #[test]
    fn output_under_metadata_is_accepted() {
        let body = json!({
            "metadata": {
                "state": "JOB_STATE_SUCCEEDED",
                "output": { "inlinedResponses": { "inlinedResponses": [image_item("aGVsbG8=")] } }
            }
        });
        assert_eq!(parse_status(&body).unwrap().items.len(), 1);
    }

    #[test]
    fn failed_job_carries_error_message() {
        let body = json!({
            "metadata": { "state": "BATCH_STATE_FAILED" },
            "error": { "message": "quota exceeded" }
        });
        let status = parse_status(&body).unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(matches!(
            parse_status(&json!({})),
            Err(GenerationError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_status(&json!({ "state": "JOB_STATE_WEIRD" })),
            Err(GenerationError::UnknownState(s)) if s == "JOB_STATE_WEIRD"
        ));
        assert!(matches!(
            parse_status(&json!({ "state": "JOB_STATE_SUCCEEDED" })),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn bad_base64_is_an_error() {
        let body = json!({
            "state": "JOB_STATE_SUCCEEDED",
            "response": { "inlinedResponses": { "inlinedResponses": [image_item("!!not base64!!")] } }
        });
        assert!(matches!(
            parse_status(&body),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_api_key_is_reported_by_variable_name() {
        let render = RenderConfig {
            api_key_env: "COMIC_FACTORY_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..RenderConfig::default()
        };
        assert!(matches!(
            GeminiBackend::from_config(&render),
            Err(GenerationError::MissingApiKey(var)) if var == "COMIC_FACTORY_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
