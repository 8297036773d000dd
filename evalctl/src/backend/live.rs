//! HTTP client for a live model backend.
//!
//! Wire contract: `POST {base}/chat` with
//! `{query, model, temperature, max_tokens, system_prompt}`; a 2xx reply
//! carries the text in either `response` or `message`, plus optional
//! `tokens_input`/`tokens_output` usage counts.

use super::{BackendError, BackendReply, ModelBackend};
use crate::{catalog::Model, evaluator::EvaluationParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: Option<String>,
    message: Option<String>,
    tokens_input: Option<u64>,
    tokens_output: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LiveBackend {
    client: reqwest::Client,
    chat_url: Url,
}

impl LiveBackend {
    /// Build a client for the backend at `base_url`, with a per-call timeout.
    pub fn new(base_url: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let chat_url = base_url.join("chat")?;
        Ok(Self { client, chat_url })
    }
}

#[async_trait::async_trait]
impl ModelBackend for LiveBackend {
    async fn complete(
        &self,
        prompt: &str,
        model: &Model,
        params: &EvaluationParams,
    ) -> Result<BackendReply, BackendError> {
        let body = ChatRequest {
            query: prompt,
            model: &model.id,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            system_prompt: params.system_prompt.as_deref(),
        };

        let response = self.client.post(self.chat_url.clone()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        let reply: ChatReply = response.json().await?;
        let text = reply
            .response
            .or(reply.message)
            .ok_or(BackendError::MalformedReply)?;

        Ok(BackendReply {
            text,
            tokens_in: reply.tokens_input,
            tokens_out: reply.tokens_output,
        })
    }
}
