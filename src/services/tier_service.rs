// ==================== TIER POLICY ENGINE ====================
// Decide quantos cards ficam visíveis para o plano do usuário;
// o restante vira placeholder bloqueado com link de upgrade.

use crate::models::{Card, CardSet, SubscriptionTier, TierLimits};

#[derive(Debug, Clone)]
pub struct TierPolicy {
    limits: TierLimits,
    upgrade_link: String,
}

impl TierPolicy {
    pub fn new(limits: TierLimits, upgrade_link: impl Into<String>) -> Self {
        Self {
            limits,
            upgrade_link: upgrade_link.into(),
        }
    }

    /// Bloqueia todo card com índice >= limite do plano. Mantém o tamanho da lista.
    pub fn apply(&self, cards: CardSet, tier: SubscriptionTier) -> CardSet {
        let Some(limit) = self.limits.limit_for(tier) else {
            return cards;
        };

        if cards.len() <= limit {
            return cards;
        }

        log::debug!("🔒 Locking {} of {} flashcards for {} tier", cards.len() - limit, cards.len(), tier);

        cards
            .into_iter()
            .enumerate()
            .map(|(index, card)| {
                if index >= limit {
                    Card::locked_placeholder(&self.upgrade_link)
                } else {
                    card
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://billing.example/upgrade";

    fn cards(count: usize) -> CardSet {
        (0..count).map(|i| Card::new(format!("Q{}", i), format!("A{}", i))).collect()
    }

    fn policy() -> TierPolicy {
        TierPolicy::new(TierLimits::default(), LINK)
    }

    #[test]
    fn test_free_tier_counts_for_every_size() {
        for n in 0..=10 {
            let result = policy().apply(cards(n), SubscriptionTier::Free);
            let unlocked = result.iter().filter(|c| !c.locked).count();
            let locked = result.iter().filter(|c| c.locked).count();
            assert_eq!(result.len(), n);
            assert_eq!(unlocked, n.min(8));
            assert_eq!(locked, n.saturating_sub(8));
        }
    }

    #[test]
    fn test_paid_tiers_never_lock() {
        for tier in [SubscriptionTier::Basic, SubscriptionTier::Pro] {
            let result = policy().apply(cards(10), tier);
            assert_eq!(result, cards(10));
        }
    }

    #[test]
    fn test_locked_cards_carry_link_and_no_back() {
        let result = policy().apply(cards(10), SubscriptionTier::Free);
        assert_eq!(&result[..8], &cards(8)[..]);
        for card in &result[8..] {
            assert!(card.locked);
            assert!(card.back.is_empty());
            assert_eq!(card.link.as_deref(), Some(LINK));
            assert_eq!(card.front, "Upgrade to Pro");
        }
    }

    #[test]
    fn test_limits_are_configurable_per_tier() {
        let limits = TierLimits {
            free: Some(2),
            basic: Some(5),
            pro: None,
        };
        let policy = TierPolicy::new(limits, LINK);
        let basic = policy.apply(cards(7), SubscriptionTier::Basic);
        assert_eq!(basic.iter().filter(|c| c.locked).count(), 2);
        let free = policy.apply(cards(7), SubscriptionTier::Free);
        assert_eq!(free.iter().filter(|c| c.locked).count(), 5);
    }

    #[test]
    fn test_deterministic() {
        let first = policy().apply(cards(10), SubscriptionTier::Free);
        let second = policy().apply(cards(10), SubscriptionTier::Free);
        assert_eq!(first, second);
    }
}
