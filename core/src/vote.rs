use crate::action::{Action, PerAction};
use crate::ensemble::CellVote;
use serde::{Deserialize, Serialize};

/// Entropy-weighted running sums, one per action.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoteVector {
    sums: PerAction<f32>,
}

/// Normalized snapshot of a [`VoteVector`], handed to the decision stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteDistribution {
    pub weights: PerAction<f32>,
    /// Sum of the raw votes the weights were normalized by.
    pub total: f32,
}

impl VoteDistribution {
    /// Weights of `actions`, in order.
    pub fn weights_for(&self, actions: &[Action]) -> Vec<f32> {
        actions.iter().map(|&action| self.weights[action]).collect()
    }
}

impl VoteVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits both picks of a cell with its entropy.
    pub fn record(&mut self, vote: &CellVote) {
        self.sums[vote.best] += vote.entropy;
        self.sums[vote.worst] += vote.entropy;
    }

    pub fn sums(&self) -> &PerAction<f32> {
        &self.sums
    }

    pub fn total(&self) -> f32 {
        self.sums.values().iter().sum()
    }

    /// Normalizes by the total and resets every sum. A zero (or non-finite) total yields
    /// an all-zero distribution.
    pub fn take_distribution(&mut self) -> VoteDistribution {
        let total = self.total();
        let weights = if total > 0.0 && total.is_finite() {
            PerAction::from_fn(|action| self.sums[action] / total)
        } else {
            PerAction::default()
        };
        self.sums = PerAction::default();
        VoteDistribution { weights, total }
    }
}
