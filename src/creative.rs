//! # Creative Prompt Module
//!
//! Asks a chat-completion language model to imagine the sounds of a list of
//! activities. The model is primed with a few worked examples and must answer
//! with a JSON object of the form `{"sounds": [...]}` holding exactly one
//! string per activity, in order.
//!
//! The HTTP client lives behind [`PromptCompleter`] so the parsing rules can
//! be exercised without a network.

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Value};

const SYSTEM_PROMPT: &str = "Creative assistant in generating sound prompts from a given list of events. \
     Outputs a json object of sounds. Size of the output should be the same as the input";

/// Worked examples as (user, assistant) turns
const FEW_SHOT: &[(&str, &str)] = &[
    (
        r#"["Commute to work", "Walk by the beach"]"#,
        r#"{"sounds": ["Cars honking in traffic", "Footsteps tapping on the sand with waves in the background"]}"#,
    ),
    (
        r#"["Virtual Meeting with Nathan", "Beer and Chips with Friends"]"#,
        r#"{"sounds": ["Keyboard typing and mouse clicks", "Laughter and the clinking of glasses, crunching of chips"]}"#,
    ),
    (
        r#"["Meeting with Joe"]"#,
        r#"{"sounds": ["Keyboard typing and mouse clicks with chatter in the background"]}"#,
    ),
    (
        r#"["'23.FAL.B.1 Pod Meeting - MLH Fellowship", "Oscar Mier and Nathan Kurelo Wilk", "Monday MS FinTech Classes", "Tuesday MS FinTech Classes", "23.FAL.B.1 Pod Meeting - MLH Fellowship", "Wednesday MS FinTech Classes"]"#,
        r#"{"sounds": ["Mic feedback, low murmur of voices discussing on a conference call", "Ambient room noise", "Turning pages, lecturer speaking faintly in the background", "Turning pages, lecturer speaking faintly in the background", "Mic feedback, low murmur of voices discussing on a conference call", "Turning pages, lecturer speaking faintly in the background"]}"#,
    ),
];

/// Key of the prompt array in the model's reply
pub const SOUNDS_KEY: &str = "sounds";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A provider-neutral chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// External text-completion collaborator.
///
/// Returns the raw text of the model's answer. Network, auth and rate limit
/// failures surface as [`Error::PromptResolution`]; retrying is up to the
/// implementation.
pub trait PromptCompleter {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Build the few-shot request for a list of activity names.
pub fn build_request(names: &[String], deterministic: bool) -> Result<CompletionRequest> {
    let mut messages = vec![ChatMessage::new("system", SYSTEM_PROMPT)];
    for (user, assistant) in FEW_SHOT {
        messages.push(ChatMessage::new("user", *user));
        messages.push(ChatMessage::new("assistant", *assistant));
    }
    let encoded = serde_json::to_string(names)
        .map_err(|e| Error::prompt(format!("Failed to encode activities: {e}")))?;
    messages.push(ChatMessage::new("user", encoded));

    Ok(CompletionRequest {
        messages,
        temperature: if deterministic { 0.0 } else { 1.0 },
        max_tokens: 1101,
    })
}

/// Extract exactly `expected` prompts from the model's JSON answer.
pub fn parse_sounds(reply: &str, expected: usize) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(reply.trim())
        .map_err(|e| Error::prompt(format!("Model reply is not valid JSON: {e}")))?;

    let sounds = value
        .get(SOUNDS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::prompt(format!("Model reply has no '{SOUNDS_KEY}' array")))?;

    let prompts = sounds
        .iter()
        .map(|s| {
            s.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::prompt(format!("Non-string entry in '{SOUNDS_KEY}': {s}")))
        })
        .collect::<Result<Vec<_>>>()?;

    if prompts.len() != expected {
        return Err(Error::prompt(format!(
            "Model returned {} sounds for {expected} activities",
            prompts.len()
        )));
    }
    Ok(prompts)
}

/// Run one creative query for the given names.
pub fn query(
    completer: &dyn PromptCompleter,
    names: &[String],
    deterministic: bool,
) -> Result<Vec<String>> {
    let request = build_request(names, deterministic)?;
    let reply = completer.complete(&request)?;
    debug!("Model reply: {reply}");
    parse_sounds(&reply, names.len())
}

/// OpenAI-compatible `/chat/completions` client
pub struct OpenAiCompleter {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompleter {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    /// Build a client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::prompt(format!(
                    "No API key found. Set {} to use creative prompts",
                    config.api_key_env
                ))
            })?;
        Ok(Self::new(&config.base_url, &config.model, api_key))
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn payload(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0,
            "response_format": { "type": "json_object" }
        })
    }
}

impl PromptCompleter for OpenAiCompleter {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        info!("Querying {} at {}", self.model, self.base_url);
        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&self.payload(request))
            .send()
            .map_err(|e| Error::prompt(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::prompt(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| body.clone());
            return Err(Error::prompt(format!("HTTP {status}: {message}")));
        }

        extract_content(&body)
    }
}

/// Pull the assistant message out of a chat completion response body.
pub fn extract_content(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| Error::prompt(format!("Failed to parse response JSON: {e}")))?;
    if let Some(err) = v.get("error") {
        let msg = err["message"].as_str().unwrap_or("Unknown error");
        return Err(Error::prompt(format!("API error: {msg}")));
    }
    v["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::prompt("Response has no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_request_ends_with_encoded_names() {
        let request = build_request(&names(&["Meeting with Joe", "Gym"]), false).unwrap();
        let last = request.messages.last().unwrap();
        assert_eq!(last.role, "user");
        assert_eq!(last.content, r#"["Meeting with Joe","Gym"]"#);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages.len(), 2 + FEW_SHOT.len() * 2);
    }

    #[test]
    fn test_few_shot_answers_are_valid_replies() {
        for (user, assistant) in FEW_SHOT {
            let asked: Vec<String> = serde_json::from_str(user).unwrap();
            assert_eq!(parse_sounds(assistant, asked.len()).unwrap().len(), asked.len());
        }
    }

    #[test]
    fn test_deterministic_maps_to_temperature() {
        let input = names(&["a"]);
        assert_eq!(build_request(&input, true).unwrap().temperature, 0.0);
        assert_eq!(build_request(&input, false).unwrap().temperature, 1.0);
    }

    #[test]
    fn test_parse_sounds_errors() {
        assert!(parse_sounds("not json", 1).is_err());
        assert!(parse_sounds(r#"{"noises": ["x"]}"#, 1).is_err());
        assert!(parse_sounds(r#"{"sounds": "x"}"#, 1).is_err());
        assert!(parse_sounds(r#"{"sounds": [1]}"#, 1).is_err());
        assert!(parse_sounds(r#"{"sounds": ["x", "y"]}"#, 1).is_err());
        assert_eq!(parse_sounds(r#" {"sounds": ["x"]} "#, 1).unwrap(), vec!["x"]);
    }

    #[test]
    fn test_payload_requests_json_object() {
        let completer = OpenAiCompleter::new("https://example.test/v1/", "gpt-test", "key".into());
        assert_eq!(completer.url(), "https://example.test/v1/chat/completions");

        let request = build_request(&names(&["Lunch"]), true).unwrap();
        let payload = completer.payload(&request);
        assert_eq!(payload["model"], "gpt-test");
        assert_eq!(payload["temperature"], 0.0);
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["messages"][0]["role"], "system");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"sounds\": []}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"sounds": []}"#);

        let err = extract_content(r#"{"error": {"message": "Rate limit reached"}}"#).unwrap_err();
        assert!(err.to_string().contains("Rate limit reached"));

        assert!(extract_content(r#"{"choices": []}"#).is_err());
    }

    #[test]
    fn test_from_config_without_key() {
        let config = LlmConfig {
            api_key_env: "DAYSCORE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiCompleter::from_config(&config),
            Err(Error::PromptResolution(_))
        ));
    }
}
