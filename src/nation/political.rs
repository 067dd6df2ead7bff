//! Political systems and the rules they impose on military action

use serde::{Deserialize, Serialize};

/// Government type of a nation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoliticalSystem {
    #[default]
    Democracy,
    Dictatorship,
    Socialist,
}

/// Training discount for military dictatorships
pub const DICTATORSHIP_COST_MULTIPLIER: f64 = 0.75;

impl PoliticalSystem {
    /// Multiplier applied to unit training cost
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            PoliticalSystem::Dictatorship => DICTATORSHIP_COST_MULTIPLIER,
            PoliticalSystem::Democracy | PoliticalSystem::Socialist => 1.0,
        }
    }

    /// Democracies cannot launch attacks without a casus belli
    pub fn requires_war_justification(&self) -> bool {
        matches!(self, PoliticalSystem::Democracy)
    }
}
