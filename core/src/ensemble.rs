use crate::action::{Action, MarkovState};
use crate::autoencoder::{Autoencoder, TrainingConfig};
use crate::patch::Patch;
use crate::rng::autoencoder_seed;
use rand::Rng;

/// Best- and worst-reconstructing members for one set of losses.
#[derive(Clone, Debug, PartialEq)]
pub struct Ranking {
    pub best: Action,
    pub worst: Action,
    pub losses: Vec<f32>,
}

impl Ranking {
    /// The first strictly smallest loss wins `best`; `worst` starts at the first member
    /// with a zero loss and only moves on strictly greater losses.
    pub fn from_losses(actions: &[Action], losses: Vec<f32>) -> Self {
        let first = actions.first().copied().unwrap_or_default();
        let (mut best, mut best_loss) = (first, f32::MAX);
        let (mut worst, mut worst_loss) = (first, 0.0f32);
        for (&action, &loss) in actions.iter().zip(&losses) {
            if loss < best_loss {
                best = action;
                best_loss = loss;
            }
            if loss > worst_loss {
                worst = action;
                worst_loss = loss;
            }
        }
        Self {
            best,
            worst,
            losses,
        }
    }
}

/// Outcome of evaluating one grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellVote {
    pub best: Action,
    pub worst: Action,
    pub entropy: f32,
}

/// One autoencoder per active action, all sharing a vector width.
#[derive(Clone, Debug)]
pub struct Ensemble {
    actions: &'static [Action],
    members: Vec<Autoencoder>,
}

impl Ensemble {
    pub fn new(
        actions: &'static [Action],
        width: usize,
        markov_order: usize,
        base_seed: u64,
        slot: u64,
        training: TrainingConfig,
    ) -> Self {
        let members = actions
            .iter()
            .map(|action| {
                let seed = autoencoder_seed(base_seed, slot, action.index());
                Autoencoder::new(width, markov_order, seed, training)
            })
            .collect();
        Self { actions, members }
    }

    pub fn actions(&self) -> &'static [Action] {
        self.actions
    }

    pub fn member(&self, action: Action) -> Option<&Autoencoder> {
        self.actions
            .iter()
            .position(|&a| a == action)
            .map(|i| &self.members[i])
    }

    pub fn rank(&self, input: &[f32], output: &[f32], markov: Option<&MarkovState>) -> Ranking {
        let losses = self
            .members
            .iter()
            .map(|member| member.measure(input, output, markov))
            .collect();
        Ranking::from_losses(self.actions, losses)
    }

    /// Trains the member for `action`; returns its pre-update loss.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        action: Action,
        input: &[f32],
        output: &[f32],
        rng: &mut R,
        markov: Option<&MarkovState>,
    ) -> f32 {
        match self.actions.iter().position(|&a| a == action) {
            Some(i) => self.members[i].encode(input, output, rng, markov),
            None => 0.0,
        }
    }

    pub fn diverged_steps(&self) -> u64 {
        self.members.iter().map(Autoencoder::diverged_steps).sum()
    }

    /// Measures every member on `patch`, trains the worst one and reports both picks.
    pub fn evaluate_patch<R: Rng + ?Sized>(
        &mut self,
        patch: &Patch,
        markov: &MarkovState,
        rng: &mut R,
    ) -> CellVote {
        let ranking = self.rank(&patch.input, &patch.target, Some(markov));
        self.train(ranking.worst, &patch.input, &patch.target, rng, Some(markov));
        CellVote {
            best: ranking.best,
            worst: ranking.worst,
            entropy: patch.entropy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::rng::seeded;

    #[test]
    fn ranking_prefers_first_of_equal_losses() {
        let ranking = Ranking::from_losses(&Action::ALL, vec![0.3, 0.1, 0.1, 0.9, 0.9, 0.2]);
        assert_eq!(ranking.best, Action::Right);
        assert_eq!(ranking.worst, Action::Backward);

        let flat = Ranking::from_losses(&Action::ALL, vec![0.0; 6]);
        assert_eq!((flat.best, flat.worst), (Action::Left, Action::Left));

        let nan = Ranking::from_losses(&Action::ALL, vec![f32::NAN; 6]);
        assert_eq!((nan.best, nan.worst), (Action::Left, Action::Left));
    }

    #[test]
    fn evaluation_trains_only_the_worst_member() {
        let config = EngineConfig::default();
        let mut ensemble = Ensemble::new(config.actions(), 64, 2, 1, 0, (&config).into());
        let patch = Patch {
            input: vec![0.25; 64],
            target: vec![0.25; 64],
            entropy: 0.0,
        };
        let markov = MarkovState::new(2);
        let vote = ensemble.evaluate_patch(&patch, &markov, &mut seeded(4));
        for &action in ensemble.actions() {
            let iterations = ensemble.member(action).map(Autoencoder::iteration);
            let expected = if action == vote.worst { 1 } else { 0 };
            assert_eq!(iterations, Some(expected), "action={action}");
        }
        assert_ne!(vote.best, vote.worst);
    }

    #[test]
    fn members_start_from_distinct_weights() {
        let config = EngineConfig::default();
        let ensemble = Ensemble::new(config.actions(), 64, 2, 1, 7, (&config).into());
        let left = ensemble.member(Action::Left).expect("left");
        let right = ensemble.member(Action::Right).expect("right");
        assert_ne!(left.tensors()[0].values(), right.tensors()[0].values());
        assert!(ensemble.member(Action::Activate).is_some());
    }
}
