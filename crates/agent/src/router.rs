//! Model router: which tier serves which phase.
//!
//! Fixed policy. Changing it means changing this table, not asking the router.

use clawloop_core::model::{ModelTier, Phase};

pub struct ModelRouter;

impl ModelRouter {
    pub const fn select(phase: Phase) -> ModelTier {
        match phase {
            Phase::QuotaCheck | Phase::TopicDetect | Phase::Summarize => ModelTier::Low,
            Phase::Plan => ModelTier::Mid,
            Phase::Processing | Phase::Compaction => ModelTier::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table() {
        assert_eq!(ModelRouter::select(Phase::QuotaCheck), ModelTier::Low);
        assert_eq!(ModelRouter::select(Phase::TopicDetect), ModelTier::Low);
        assert_eq!(ModelRouter::select(Phase::Processing), ModelTier::High);
        assert_eq!(ModelRouter::select(Phase::Compaction), ModelTier::High);
        assert_eq!(ModelRouter::select(Phase::Summarize), ModelTier::Low);
        assert_eq!(ModelRouter::select(Phase::Plan), ModelTier::Mid);
    }
}
