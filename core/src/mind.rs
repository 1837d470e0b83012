use crate::action::{Action, MarkovState};
use crate::config::EngineConfig;
use crate::constants::MIND_SEED_SALT;
use crate::ensemble::Ensemble;
use crate::vote::VoteDistribution;
use rand::Rng;
use serde::Serialize;

/// Outcome of one decision step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decision {
    /// Zero-based index of the frame the decision was taken on.
    pub frame: u64,
    /// Best-reconstructed action; the one to take.
    pub action: Action,
    /// Worst-reconstructed action; its model was trained this step.
    pub learn: Action,
    /// Reconstruction loss per active action, in action order.
    pub losses: Vec<f32>,
    pub learn_loss: f32,
    pub distribution: VoteDistribution,
    /// Action history after this decision, newest first.
    pub history: Vec<Action>,
}

/// Second-level ensemble turning vote distributions into actions.
#[derive(Clone, Debug)]
pub struct DecisionMind {
    ensemble: Ensemble,
    markov: MarkovState,
    width: usize,
}

impl DecisionMind {
    pub fn new(config: &EngineConfig) -> Self {
        let width = config.mind_width();
        Self {
            ensemble: Ensemble::new(
                config.actions(),
                width,
                config.markov_order,
                config.seed ^ MIND_SEED_SALT,
                0,
                config.into(),
            ),
            markov: MarkovState::new(config.markov_order),
            width,
        }
    }

    pub fn markov(&self) -> &MarkovState {
        &self.markov
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Picks the next action from `distribution` and records it in the history.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        frame: u64,
        distribution: &VoteDistribution,
        rng: &mut R,
    ) -> Decision {
        let mut vector = distribution.weights_for(self.ensemble.actions());
        vector.resize(self.width, 0.0);

        let ranking = self.ensemble.rank(&vector, &vector, Some(&self.markov));
        let learn_loss = self
            .ensemble
            .train(ranking.worst, &vector, &vector, rng, Some(&self.markov));
        self.markov.push(ranking.best);

        Decision {
            frame,
            action: ranking.best,
            learn: ranking.worst,
            losses: ranking.losses,
            learn_loss,
            distribution: *distribution,
            history: self.markov.actions().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PerAction;
    use crate::rng::seeded;

    fn distribution() -> VoteDistribution {
        let mut weights = PerAction::default();
        weights[Action::Forward] = 0.5;
        weights[Action::Left] = 0.25;
        weights[Action::Activate] = 0.25;
        VoteDistribution {
            weights,
            total: 8.0,
        }
    }

    #[test]
    fn decision_shifts_history_and_trains_learn_target() {
        let config = EngineConfig::default();
        let mut mind = DecisionMind::new(&config);
        let before = mind.markov().actions().to_vec();
        let decision = mind.decide(0, &distribution(), &mut seeded(3));

        assert_eq!(decision.losses.len(), 6);
        assert_eq!(mind.markov().actions(), &[decision.action, before[0]]);
        assert_eq!(decision.history, mind.markov().actions());
        let min = decision.losses.iter().cloned().fold(f32::MAX, f32::min);
        let max = decision.losses.iter().cloned().fold(0.0, f32::max);
        assert_eq!(decision.losses[decision.action.index()], min);
        assert_eq!(decision.losses[decision.learn.index()], max);

        let trained = mind.ensemble().member(decision.learn).map(|m| m.iteration());
        assert_eq!(trained, Some(1));
    }

    #[test]
    fn zero_distribution_still_decides() {
        let mut mind = DecisionMind::new(&EngineConfig::default());
        let decision = mind.decide(30, &VoteDistribution::default(), &mut seeded(1));
        assert!(decision.losses.iter().all(|l| l.is_finite()));
        assert_eq!(decision.frame, 30);
    }

    #[test]
    fn reduced_action_set_only_votes_among_active_actions() {
        let config = EngineConfig {
            action_count: 4,
            mind_width: Some(6),
            ..EngineConfig::default()
        };
        let mut mind = DecisionMind::new(&config);
        for frame in 0..10 {
            let decision = mind.decide(frame, &distribution(), &mut seeded(frame));
            assert_eq!(decision.losses.len(), 4);
            assert!(config.actions().contains(&decision.action));
            assert!(config.actions().contains(&decision.learn));
        }
    }

    #[test]
    fn single_action_mind_runs_at_width_one() {
        let config = EngineConfig {
            action_count: 1,
            ..EngineConfig::default()
        };
        let mut mind = DecisionMind::new(&config);
        for frame in 0..3 {
            let decision = mind.decide(frame, &distribution(), &mut seeded(frame));
            assert_eq!(decision.action, Action::Left);
            assert_eq!(decision.learn, Action::Left);
            assert_eq!(decision.losses.len(), 1);
            assert!(decision.learn_loss.is_finite());
        }
    }
}
