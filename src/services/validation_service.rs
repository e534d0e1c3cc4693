// ==================== SCHEMA VALIDATOR ====================
// Converte a saída bruta do modelo em cards no formato fixo.
// A saída do modelo é tratada como não confiável.

use crate::models::{Card, CardSet, MAX_CARDS};
use serde_json::Value;
use thiserror::Error;

/// Saída do modelo fora do contrato `{ "flashcards": [{front, back}] }`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedOutput {
    #[error("output is not valid JSON: {0}")]
    NotJson(String),

    #[error("output is not a JSON object")]
    NotAnObject,

    #[error("field 'flashcards' is missing or not an array")]
    MissingFlashcards,

    #[error("flashcard #{index} is invalid: {reason}")]
    InvalidCard { index: usize, reason: String },
}

/// Valida a saída bruta e devolve no máximo `MAX_CARDS` cards
pub fn validate(raw: &str) -> Result<CardSet, MalformedOutput> {
    let body = strip_code_fence(raw.trim());

    let value: Value =
        serde_json::from_str(body).map_err(|e| MalformedOutput::NotJson(e.to_string()))?;

    let object = value.as_object().ok_or(MalformedOutput::NotAnObject)?;

    let items = object
        .get("flashcards")
        .and_then(Value::as_array)
        .ok_or(MalformedOutput::MissingFlashcards)?;

    let mut cards = Vec::with_capacity(items.len().min(MAX_CARDS));
    for (index, item) in items.iter().enumerate() {
        let card = parse_card(index, item)?;
        if cards.len() < MAX_CARDS {
            cards.push(card);
        }
    }

    if items.len() > MAX_CARDS {
        log::debug!("✂️  Truncated model output from {} to {} flashcards", items.len(), MAX_CARDS);
    }

    Ok(cards)
}

fn parse_card(index: usize, item: &Value) -> Result<Card, MalformedOutput> {
    let object = item.as_object().ok_or_else(|| MalformedOutput::InvalidCard {
        index,
        reason: "not an object".to_string(),
    })?;

    let front = required_text(object, "front").map_err(|reason| MalformedOutput::InvalidCard { index, reason })?;
    let back = required_text(object, "back").map_err(|reason| MalformedOutput::InvalidCard { index, reason })?;

    Ok(Card::new(front, back))
}

fn required_text(object: &serde_json::Map<String, Value>, field: &str) -> Result<String, String> {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Some(Value::String(_)) => Err(format!("'{}' is empty", field)),
        Some(_) => Err(format!("'{}' is not a string", field)),
        None => Err(format!("'{}' is missing", field)),
    }
}

/// Remove cerca Markdown (```json ... ```) que alguns modelos adicionam
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Pula o identificador de linguagem da primeira linha ("json")
    match inner.find('\n') {
        Some(newline) if !inner[..newline].trim_start().starts_with('{') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}
