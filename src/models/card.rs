use serde::{Deserialize, Serialize};

/// Teto rígido de cards por geração (independente do plano)
pub const MAX_CARDS: usize = 10;

/// Texto exibido no lugar de um card bloqueado pelo plano
pub const LOCKED_FRONT: &str = "Upgrade to Pro";

/// Card de estudo (frente/verso)
///
/// Cards bloqueados pelo plano não têm `back`; `locked` é o sinal
/// autoritativo, não a ausência do verso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Card {
    pub front: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub back: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Lista ordenada de cards produzida por uma geração
pub type CardSet = Vec<Card>;

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            locked: false,
            link: None,
        }
    }

    /// Placeholder que substitui um card além do limite do plano
    pub fn locked_placeholder(upgrade_link: &str) -> Self {
        Self {
            front: LOCKED_FRONT.to_string(),
            back: String::new(),
            locked: true,
            link: Some(upgrade_link.to_string()),
        }
    }

    /// Card desbloqueado precisa de frente e verso; bloqueado é salvo como veio
    pub fn is_well_formed(&self) -> bool {
        if self.locked {
            return true;
        }
        !self.front.trim().is_empty() && !self.back.trim().is_empty()
    }
}
