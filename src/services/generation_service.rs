// ==================== GENERATION ORCHESTRATOR ====================
// Texto do usuário → modelo → validação → política do plano.
// Nada é persistido aqui; salvar é uma ação explícita separada.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::{
    config::GenerationSettings,
    models::{CardSet, SubscriptionTier, MAX_CARDS},
    services::{
        completion_service::{CompletionClient, CompletionRequest},
        tier_service::TierPolicy,
        validation_service::{self, MalformedOutput},
    },
    utils::error::AppError,
};

lazy_static! {
    static ref SYSTEM_INSTRUCTION: String = format!(
        "You are a flashcard creator. Your task is to generate concise and effective flashcards \
based on the given topic or content. Follow these guidelines:

1. Create clear and concise questions for the front of the flashcard.
2. Provide accurate and informative answers for the back of the flashcard.
3. Focus on key concepts, definitions, facts, or relationships within the given subject.
4. Use simple language to ensure clarity and ease of understanding.
5. Avoid overly complex or lengthy content that might be difficult to remember.
6. Include a variety of question types, such as fill-in-the-blank or true/false, when appropriate.
7. Ensure that each flashcard covers a single, distinct piece of information.
8. When dealing with lists or sequences, break them down into individual flashcards.
9. Use mnemonics or memory aids when helpful for complex information.
10. Generate at most {max} flashcards.

Return only a JSON object in the following format, with no other text:
{{
    \"flashcards\": [
        {{
            \"front\": \"string\",
            \"back\": \"string\"
        }}
    ]
}}",
        max = MAX_CARDS
    );
}

const CORRECTIVE_NOTE: &str = "Your previous answer could not be parsed. Reply with ONLY the JSON \
object {\"flashcards\": [{\"front\": \"...\", \"back\": \"...\"}]} and nothing else.";

/// Limite de caracteres da saída bruta registrada no log
const RAW_LOG_LIMIT: usize = 2_000;

pub struct GenerationService {
    completion: Arc<dyn CompletionClient>,
    policy: TierPolicy,
    settings: GenerationSettings,
    max_output_tokens: u32,
}

impl GenerationService {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        policy: TierPolicy,
        settings: GenerationSettings,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            completion,
            policy,
            settings,
            max_output_tokens,
        }
    }

    /// Gera cards para `source_text` e aplica a política do plano `tier`.
    ///
    /// `caller` é a identidade já autenticada; sem ela → `Unauthorized`.
    pub async fn generate(
        &self,
        caller: Option<&str>,
        source_text: &str,
        tier: SubscriptionTier,
    ) -> Result<CardSet, AppError> {
        let user_id = caller
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let source_text = source_text.trim();
        if source_text.is_empty() {
            return Err(AppError::InvalidRequest("Please enter some text".to_string()));
        }
        if source_text.chars().count() > self.settings.max_source_chars {
            return Err(AppError::InvalidRequest(format!(
                "Text must be at most {} characters",
                self.settings.max_source_chars
            )));
        }

        log::info!("🧠 Generating flashcards for user {} ({} tier)", user_id, tier);

        let request = CompletionRequest {
            system_instruction: SYSTEM_INSTRUCTION.clone(),
            user_text: source_text.to_string(),
            max_output_tokens: self.max_output_tokens,
        };

        let first_attempt = self.complete_and_validate(&request).await?;
        let cards = match first_attempt {
            Ok(cards) => cards,
            Err(first_error) if self.settings.retry_on_malformed => {
                log::warn!("🔁 Malformed model output ({}), retrying with corrective prompt", first_error);
                let corrective = CompletionRequest {
                    user_text: format!("{}\n\n{}", source_text, CORRECTIVE_NOTE),
                    ..request
                };
                self.complete_and_validate(&corrective)
                    .await?
                    .map_err(|e| AppError::GenerationFailed(e.to_string()))?
            }
            Err(e) => return Err(AppError::GenerationFailed(e.to_string())),
        };

        let cards = self.policy.apply(cards, tier);

        log::info!(
            "✅ Generated {} flashcards for user {} ({} locked)",
            cards.len(),
            user_id,
            cards.iter().filter(|card| card.locked).count()
        );

        Ok(cards)
    }

    /// Uma chamada ao modelo com timeout. Erro externo = falha de transporte;
    /// erro interno = saída fora do contrato.
    async fn complete_and_validate(
        &self,
        request: &CompletionRequest,
    ) -> Result<Result<CardSet, MalformedOutput>, AppError> {
        let raw = tokio::time::timeout(self.settings.timeout, self.completion.complete(request))
            .await
            .map_err(|_| {
                log::error!("⏱️  Completion timed out after {:?}", self.settings.timeout);
                AppError::GenerationTimeout(self.settings.timeout.as_secs())
            })?
            .map_err(|e| {
                log::error!("❌ Completion call failed: {}", e);
                AppError::GenerationFailed(e)
            })?;

        let validated = validation_service::validate(&raw);
        if let Err(e) = &validated {
            let shown: String = raw.chars().take(RAW_LOG_LIMIT).collect();
            log::error!("❌ Invalid flashcards JSON ({}). Raw output: {}", e, shown);
        }

        Ok(validated)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::TierLimits;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    pub(crate) const UPGRADE_LINK: &str = "https://billing.example/upgrade";

    /// Modelo falso: devolve respostas roteirizadas e registra as requisições
    pub(crate) struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedCompletion {
        pub(crate) fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub(crate) fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(vec![Ok(cards_json(1))])
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, String> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Err("no scripted reply".to_string()))
        }
    }

    pub(crate) fn cards_json(count: usize) -> String {
        let cards: Vec<serde_json::Value> = (0..count)
            .map(|i| serde_json::json!({ "front": format!("Question {}", i), "back": format!("Answer {}", i) }))
            .collect();
        serde_json::json!({ "flashcards": cards }).to_string()
    }

    pub(crate) fn service_with(completion: Arc<ScriptedCompletion>, settings: GenerationSettings) -> GenerationService {
        GenerationService::new(
            completion,
            TierPolicy::new(TierLimits::default(), UPGRADE_LINK),
            settings,
            500,
        )
    }

    const MITOCHONDRIA: &str = "The mitochondria is the powerhouse of the cell.";

    #[tokio::test]
    async fn test_free_tier_scenario_locks_last_two() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(cards_json(10))]));
        let service = service_with(completion.clone(), GenerationSettings::default());

        let cards = service
            .generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free)
            .await
            .unwrap();

        assert_eq!(cards.len(), 10);
        assert_eq!(cards.iter().filter(|c| !c.locked).count(), 8);
        for card in &cards[8..] {
            assert!(card.locked);
            assert_eq!(card.link.as_deref(), Some(UPGRADE_LINK));
        }
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_instruction_and_text() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(cards_json(2))]));
        let service = service_with(completion.clone(), GenerationSettings::default());
        service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Pro).await.unwrap();

        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests[0].user_text, MITOCHONDRIA);
        assert_eq!(requests[0].max_output_tokens, 500);
        assert!(requests[0].system_instruction.contains("at most 10 flashcards"));
        assert!(requests[0].system_instruction.contains("\"flashcards\""));
    }

    #[tokio::test]
    async fn test_pro_tier_never_locks() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(cards_json(10))]));
        let service = service_with(completion, GenerationSettings::default());
        let cards = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Pro).await.unwrap();
        assert!(cards.iter().all(|c| !c.locked));
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(cards_json(1))]));
        let service = service_with(completion.clone(), GenerationSettings::default());

        for caller in [None, Some("  ")] {
            let result = service.generate(caller, MITOCHONDRIA, SubscriptionTier::Free).await;
            assert!(matches!(result, Err(AppError::Unauthorized(_))));
        }
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_model_call() {
        let completion = Arc::new(ScriptedCompletion::new(vec![]));
        let service = service_with(completion.clone(), GenerationSettings::default());
        let result = service.generate(Some("U1"), "  \n ", SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_too_long_text_rejected() {
        let completion = Arc::new(ScriptedCompletion::new(vec![]));
        let settings = GenerationSettings {
            max_source_chars: 5,
            ..GenerationSettings::default()
        };
        let service = service_with(completion, settings);
        let result = service.generate(Some("U1"), "abcdefgh", SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_not_json_fails_after_one_corrective_retry() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok("not json".to_string()),
            Ok("still not json".to_string()),
        ]));
        let service = service_with(completion.clone(), GenerationSettings::default());

        let result = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::GenerationFailed(_))));
        assert_eq!(completion.calls(), 2);

        let requests = completion.requests.lock().unwrap();
        assert!(requests[1].user_text.starts_with(MITOCHONDRIA));
        assert!(requests[1].user_text.contains("could not be parsed"));
    }

    #[tokio::test]
    async fn test_corrective_retry_can_recover() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok("Sure! Here are your cards".to_string()),
            Ok(cards_json(3)),
        ]));
        let service = service_with(completion, GenerationSettings::default());
        let cards = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free).await.unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[tokio::test]
    async fn test_not_json_without_retry_calls_model_once() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok("not json".to_string())]));
        let settings = GenerationSettings {
            retry_on_malformed: false,
            ..GenerationSettings::default()
        };
        let service = service_with(completion.clone(), settings);
        let result = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::GenerationFailed(_))));
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_generation_failed() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Err("connection reset".to_string())]));
        let service = service_with(completion.clone(), GenerationSettings::default());
        let result = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::GenerationFailed(_))));
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let completion = Arc::new(ScriptedCompletion::slow(Duration::from_millis(500)));
        let settings = GenerationSettings {
            timeout: Duration::from_millis(20),
            ..GenerationSettings::default()
        };
        let service = service_with(completion, settings);
        let result = service.generate(Some("U1"), MITOCHONDRIA, SubscriptionTier::Free).await;
        assert!(matches!(result, Err(AppError::GenerationTimeout(_))));
    }
}
