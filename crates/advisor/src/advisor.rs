//! The advisory request builder.
//!
//! One call to [`Advisor::advise`]:
//!
//! 1. loads the farmer (missing → `NotFound`)
//! 2. aggregates the context and reads the recent history window
//! 3. sends policy + history + the new turn to the model
//! 4. reads the reply as `{language, response}`, or detects the language
//!    of the raw text when the reply is not that object
//! 5. appends the user/assistant pair to history in one store operation

use crate::context::ContextAggregator;
use crate::language::detect_language_tag;
use crate::prompt::advisory_policy;
use agromind_core::error::Error;
use agromind_core::farm::HistoryTurn;
use agromind_core::message::{ImageAttachment, Message};
use agromind_core::provider::{Provider, ProviderRequest};
use agromind_core::store::FarmStore;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The two-field reply returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvisoryReply {
    pub language: String,
    pub response: String,
}

impl AdvisoryReply {
    /// The fixed payload sent when a query cannot be answered.
    pub fn failure() -> Self {
        Self {
            language: "en-US".into(),
            response: "Sorry, a server error occurred.".into(),
        }
    }
}

/// Which path produced the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryOutcome {
    /// The model returned the JSON object it was asked for.
    Structured(AdvisoryReply),

    /// The model returned something else; `language` was detected.
    DetectedFallback(AdvisoryReply),
}

impl AdvisoryOutcome {
    pub fn reply(&self) -> &AdvisoryReply {
        match self {
            Self::Structured(reply) | Self::DetectedFallback(reply) => reply,
        }
    }

    pub fn into_reply(self) -> AdvisoryReply {
        match self {
            Self::Structured(reply) | Self::DetectedFallback(reply) => reply,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::DetectedFallback(_))
    }
}

/// Read a raw model reply.
pub fn interpret_reply(raw: &str) -> AdvisoryOutcome {
    // Derived struct deserializers also take sequences; only an object counts.
    let parsed = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value::<AdvisoryReply>(value).map_err(|e| e.to_string())
        }
        Ok(_) => Err("reply is not a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    };

    match parsed {
        Ok(reply) => AdvisoryOutcome::Structured(reply),
        Err(reason) => {
            debug!(reason = %reason, "Model reply is not the expected JSON object");
            AdvisoryOutcome::DetectedFallback(AdvisoryReply {
                language: detect_language_tag(raw).to_string(),
                response: raw.to_string(),
            })
        }
    }
}

/// A farmer's question.
#[derive(Debug, Clone)]
pub struct AdvisoryRequest {
    pub farmer_id: String,
    pub query: String,
    /// Base64 JPEG, with or without a `data:` prefix
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Stored turns replayed to the model
    pub history_window: usize,
    /// Stored turns kept per farmer; `None` keeps everything
    pub history_retention: Option<usize>,
}

impl AdvisorSettings {
    pub fn from_config(config: &agromind_config::AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            history_window: config.advisory.history_window,
            history_retention: config.advisory.retention(),
        }
    }
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self::from_config(&agromind_config::AppConfig::default())
    }
}

pub struct Advisor {
    store: Arc<dyn FarmStore>,
    aggregator: ContextAggregator,
    provider: Arc<dyn Provider>,
    settings: AdvisorSettings,
}

impl Advisor {
    pub fn new(
        store: Arc<dyn FarmStore>,
        provider: Arc<dyn Provider>,
        settings: AdvisorSettings,
    ) -> Self {
        Self {
            aggregator: ContextAggregator::new(store.clone()),
            store,
            provider,
            settings,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn advise(&self, request: AdvisoryRequest) -> Result<AdvisoryOutcome, Error> {
        let farmer = self
            .store
            .find_farmer(&request.farmer_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("farmer '{}'", request.farmer_id)))?;

        let query = request.query.as_str();
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        let image = request.image.as_deref().map(decode_image).transpose()?.flatten();

        let (context, history) = tokio::try_join!(
            self.aggregator.aggregate(&farmer),
            self.store
                .recent_history(&farmer.id, self.settings.history_window),
        )?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(advisory_policy(&farmer, &context, query)));
        messages.extend(history.iter().map(HistoryTurn::to_message));
        let mut turn = Message::user(query);
        if let Some(image) = image {
            turn = turn.with_image(image);
        }
        messages.push(turn);

        debug!(
            farmer_id = %farmer.id,
            history = history.len(),
            has_image = request.image.is_some(),
            "Sending advisory request"
        );

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.settings.model.clone(),
                messages,
                temperature: self.settings.temperature,
                max_tokens: Some(self.settings.max_tokens),
            })
            .await?;

        let outcome = interpret_reply(&response.message.content);
        if outcome.is_fallback() {
            warn!(farmer_id = %farmer.id, "Model ignored the JSON contract; language detected from text");
        }

        self.store
            .append_history(
                &farmer.id,
                &[
                    HistoryTurn::user(query),
                    HistoryTurn::assistant(outcome.reply().response.clone()),
                ],
                self.settings.history_retention,
            )
            .await?;

        info!(
            farmer_id = %farmer.id,
            language = %outcome.reply().language,
            fallback = outcome.is_fallback(),
            model = %response.model,
            "Advisory answered"
        );
        Ok(outcome)
    }
}

/// Validate an inline image. An empty string means no image.
fn decode_image(raw: &str) -> Result<Option<ImageAttachment>, Error> {
    let data = match raw.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => raw,
    }
    .trim();

    if data.is_empty() {
        return Ok(None);
    }
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| Error::Validation(format!("image is not valid base64: {e}")))?;
    Ok(Some(ImageAttachment::jpeg(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agromind_core::error::ProviderError;
    use agromind_core::farm::{MarketPrice, MarketSnapshot, NewFarmer};
    use agromind_core::message::Role;
    use agromind_core::provider::{ProviderResponse, Usage};
    use agromind_store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Returns a fixed reply and records every request it sees.
    struct ScriptedProvider {
        reply: String,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> ProviderRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            Ok(ProviderResponse {
                message: Message::assistant(self.reply.clone()),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            })
        }
    }

    async fn punjab_farmer(store: &InMemoryStore) -> String {
        store
            .create_farmer(NewFarmer {
                name: "Gurpreet".into(),
                username: "gurpreet".into(),
                password_hash: "h".into(),
                region: "Punjab".into(),
                language: Some("pa-IN".into()),
            })
            .await
            .unwrap()
            .id
    }

    fn request(farmer_id: &str, query: &str) -> AdvisoryRequest {
        AdvisoryRequest {
            farmer_id: farmer_id.into(),
            query: query.into(),
            image: None,
        }
    }

    #[test]
    fn structured_reply_is_kept() {
        let outcome = interpret_reply(r#"{"language":"hi-IN","response":"Sarson boiye."}"#);
        assert_eq!(
            outcome,
            AdvisoryOutcome::Structured(AdvisoryReply {
                language: "hi-IN".into(),
                response: "Sarson boiye.".into(),
            })
        );
    }

    #[test]
    fn extra_or_missing_fields_fall_back() {
        assert!(interpret_reply(r#"{"language":"hi-IN","response":"x","mood":"happy"}"#).is_fallback());
        assert!(interpret_reply(r#"{"response":"x"}"#).is_fallback());
        assert!(interpret_reply(r#"["hi-IN","x"]"#).is_fallback());
    }

    #[test]
    fn json_array_reply_is_not_structured() {
        let raw = r#"["ta-IN","Plant millet"]"#;
        let outcome = interpret_reply(raw);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reply().response, raw);
    }

    #[test]
    fn french_text_falls_back_to_en_in_verbatim() {
        let outcome = interpret_reply("Bonjour, il va pleuvoir");
        assert!(outcome.is_fallback());
        assert_eq!(
            outcome.into_reply(),
            AdvisoryReply {
                language: "en-IN".into(),
                response: "Bonjour, il va pleuvoir".into(),
            }
        );
    }

    #[test]
    fn image_accepts_plain_and_data_url_forms() {
        let plain = decode_image("/9j/4AAQSkZJRg==").unwrap().unwrap();
        assert_eq!(plain.data_url(), "data:image/jpeg;base64,/9j/4AAQSkZJRg==");

        let prefixed = decode_image("data:image/jpeg;base64,/9j/4AAQSkZJRg==").unwrap().unwrap();
        assert_eq!(prefixed.data, "/9j/4AAQSkZJRg==");

        assert!(decode_image("").unwrap().is_none());
        assert!(matches!(decode_image("not base64!!"), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn punjab_scenario() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        store
            .upsert_market(
                &farmer_id,
                MarketSnapshot {
                    top_prices: vec![MarketPrice {
                        commodity: "Wheat".into(),
                        mandi: "Khanna".into(),
                        modal_price: "2100".into(),
                    }],
                    last_updated: Utc::now(),
                },
            )
            .await
            .unwrap();

        let reply = r#"{"language":"pa-IN","response":"ਕਣਕ ਅਤੇ ਸਰ੍ਹੋਂ ਚੰਗੇ ਵਿਕਲਪ ਹਨ।"}"#;
        let provider = ScriptedProvider::new(reply);
        let advisor = Advisor::new(store.clone(), provider.clone(), AdvisorSettings::default());

        let outcome = advisor
            .advise(request(&farmer_id, "What should I plant?"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdvisoryOutcome::Structured(AdvisoryReply {
                language: "pa-IN".into(),
                response: "ਕਣਕ ਅਤੇ ਸਰ੍ਹੋਂ ਚੰਗੇ ਵਿਕਲਪ ਹਨ।".into(),
            })
        );

        let sent = provider.last_request();
        assert_eq!(sent.max_tokens, Some(400));
        assert_eq!(sent.messages.len(), 2);
        let policy = &sent.messages[0].content;
        assert_eq!(sent.messages[0].role, Role::System);
        assert!(policy.contains("Latest Mandi Prices: Wheat: ₹2100"));
        assert!(policy.contains("Weather data not available."));
        assert!(policy.contains("Soil analysis data not available."));
        assert!(policy.contains("Region: Punjab"));
        assert_eq!(sent.messages[1].content, "What should I plant?");

        let history = store.recent_history(&farmer_id, 10).await.unwrap();
        assert_eq!(
            history,
            vec![
                HistoryTurn::user("What should I plant?"),
                HistoryTurn::assistant("ਕਣਕ ਅਤੇ ਸਰ੍ਹੋਂ ਚੰਗੇ ਵਿਕਲਪ ਹਨ।"),
            ]
        );
    }

    #[tokio::test]
    async fn only_last_four_turns_are_replayed() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let turns: Vec<HistoryTurn> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    HistoryTurn::user(format!("turn {i}"))
                } else {
                    HistoryTurn::assistant(format!("turn {i}"))
                }
            })
            .collect();
        store.append_history(&farmer_id, &turns, None).await.unwrap();

        let provider = ScriptedProvider::new(r#"{"language":"pa-IN","response":"ok"}"#);
        let advisor = Advisor::new(store.clone(), provider.clone(), AdvisorSettings::default());
        advisor.advise(request(&farmer_id, "next?")).await.unwrap();

        let sent = provider.last_request();
        let replayed: Vec<&str> = sent.messages[1..5].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(replayed, vec!["turn 6", "turn 7", "turn 8", "turn 9"]);
        assert_eq!(sent.messages.len(), 6);
        assert_eq!(store.history_len(&farmer_id).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn fallback_reply_is_stored_verbatim() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let provider = ScriptedProvider::new("Bonjour, il va pleuvoir");
        let advisor = Advisor::new(store.clone(), provider, AdvisorSettings::default());

        let outcome = advisor.advise(request(&farmer_id, "Will it rain?")).await.unwrap();
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reply().language, "en-IN");

        let history = store.recent_history(&farmer_id, 2).await.unwrap();
        assert_eq!(history[1], HistoryTurn::assistant("Bonjour, il va pleuvoir"));
    }

    #[tokio::test]
    async fn image_is_attached_to_the_new_turn() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let provider = ScriptedProvider::new(r#"{"language":"pa-IN","response":"Aphids."}"#);
        let advisor = Advisor::new(store.clone(), provider.clone(), AdvisorSettings::default());

        advisor
            .advise(AdvisoryRequest {
                farmer_id: farmer_id.clone(),
                query: "What is on my leaves?".into(),
                image: Some("/9j/4AAQSkZJRg==".into()),
            })
            .await
            .unwrap();

        let sent = provider.last_request();
        let image = sent.messages.last().unwrap().image.as_ref().unwrap();
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9j/4AAQSkZJRg==");
    }

    #[tokio::test]
    async fn unknown_farmer_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let provider = ScriptedProvider::new("unused");
        let advisor = Advisor::new(store, provider.clone(), AdvisorSettings::default());

        let err = advisor.advise(request("ghost", "hello")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_farmer_wins_over_bad_input() {
        let store = Arc::new(InMemoryStore::new());
        let advisor = Advisor::new(store, ScriptedProvider::new("unused"), AdvisorSettings::default());

        let err = advisor
            .advise(AdvisoryRequest {
                farmer_id: "ghost".into(),
                query: "  ".into(),
                image: Some("not base64!!".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn query_text_is_stored_verbatim() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let provider = ScriptedProvider::new(r#"{"language":"pa-IN","response":"ok"}"#);
        let advisor = Advisor::new(store.clone(), provider.clone(), AdvisorSettings::default());

        advisor
            .advise(request(&farmer_id, "  Will it rain?\n"))
            .await
            .unwrap();

        let sent = provider.last_request();
        assert_eq!(sent.messages.last().unwrap().content, "  Will it rain?\n");
        let history = store.recent_history(&farmer_id, 2).await.unwrap();
        assert_eq!(history[0], HistoryTurn::user("  Will it rain?\n"));
    }

    #[tokio::test]
    async fn provider_failure_leaves_history_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let advisor = Advisor::new(store.clone(), Arc::new(FailingProvider), AdvisorSettings::default());

        let err = advisor.advise(request(&farmer_id, "hello")).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::RateLimited { .. })));
        assert_eq!(store.history_len(&farmer_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retention_prunes_oldest_turns() {
        let store = Arc::new(InMemoryStore::new());
        let farmer_id = punjab_farmer(&store).await;
        let provider = ScriptedProvider::new(r#"{"language":"pa-IN","response":"ok"}"#);
        let settings = AdvisorSettings {
            history_retention: Some(4),
            ..AdvisorSettings::default()
        };
        let advisor = Advisor::new(store.clone(), provider, settings);

        for q in ["one", "two", "three"] {
            advisor.advise(request(&farmer_id, q)).await.unwrap();
        }
        let history = store.recent_history(&farmer_id, 10).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], HistoryTurn::user("two"));
    }
}
