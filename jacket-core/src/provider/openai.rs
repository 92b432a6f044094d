use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{config::RecommendationSettings, error::ServiceError, prompt::RecommendationPrompt};

use super::{Recommender, truncate_body};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiRecommender {
    api_key: String,
    settings: RecommendationSettings,
    http: Client,
}

impl OpenAiRecommender {
    pub fn new(api_key: String, settings: RecommendationSettings) -> Self {
        Self {
            api_key,
            settings,
            http: Client::new(),
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

fn upstream_error(status: u16, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| format!("Failed to fetch recommendation: {}", truncate_body(body)));
    ServiceError::upstream(status, message)
}

fn recommendation_from_completion(body: &str) -> Result<String, ServiceError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        ServiceError::upstream(502, format!("Failed to parse completion response: {e}"))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ServiceError::upstream(502, "Completion response contained no text"))
}

#[async_trait]
impl Recommender for OpenAiRecommender {
    #[instrument(skip(self, prompt), fields(model = %self.settings.model))]
    async fn recommend(&self, prompt: &RecommendationPrompt) -> Result<String, ServiceError> {
        let text = prompt.text();
        debug!(prompt = %text, "requesting recommendation");

        let res = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&text))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(%status, "completion request failed");
            return Err(upstream_error(status.as_u16(), &body));
        }

        recommendation_from_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let recommender = OpenAiRecommender::new("KEY".into(), RecommendationSettings::default());
        let json = serde_json::to_value(recommender.request_body("Do I need a jacket?")).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Do I need a jacket?");
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn completion_text_is_trimmed() {
        let body = r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant",
            "content": "\n  Yes, bring a light jacket.  \n"}, "finish_reason": "stop"}]}"#;
        assert_eq!(recommendation_from_completion(body).unwrap(), "Yes, bring a light jacket.");
    }

    #[test]
    fn empty_completion_is_an_error() {
        let err = recommendation_from_completion(r#"{"choices": []}"#).unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn provider_error_keeps_status_and_message() {
        let body = r#"{
            "error": {"message": "Rate limit reached", "type": "requests", "code": null}
        }"#;
        let err = upstream_error(429, body);
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.to_string(), "Rate limit reached");
    }

    #[test]
    fn provider_error_without_json() {
        let err = upstream_error(500, "upstream exploded");
        assert_eq!(err.to_string(), "Failed to fetch recommendation: upstream exploded");
    }
}
