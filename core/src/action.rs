use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Discrete action the agent can take.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Left,
    Right,
    Forward,
    Backward,
    None,
    Activate,
}

impl Action {
    pub const COUNT: usize = 6;
    pub const ALL: [Action; Action::COUNT] = [
        Action::Left,
        Action::Right,
        Action::Forward,
        Action::Backward,
        Action::None,
        Action::Activate,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::None => "none",
            Self::Activate => "activate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

/// Fixed table holding one value per [`Action`], addressed by the action itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerAction<T>([T; Action::COUNT]);

impl<T> PerAction<T> {
    pub fn from_fn(f: impl FnMut(Action) -> T) -> Self {
        Self(Action::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, &T)> {
        Action::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> &[T; Action::COUNT] {
        &self.0
    }

    pub fn values_mut(&mut self) -> &mut [T; Action::COUNT] {
        &mut self.0
    }
}

impl<T> Index<Action> for PerAction<T> {
    type Output = T;

    fn index(&self, action: Action) -> &T {
        &self.0[action.index()]
    }
}

impl<T> IndexMut<Action> for PerAction<T> {
    fn index_mut(&mut self, action: Action) -> &mut T {
        &mut self.0[action.index()]
    }
}

/// Window of the most recently taken actions, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovState {
    window: Vec<Action>,
}

impl MarkovState {
    pub fn new(order: usize) -> Self {
        Self {
            window: vec![Action::default(); order],
        }
    }

    pub fn from_actions(actions: &[Action]) -> Self {
        Self {
            window: actions.to_vec(),
        }
    }

    pub fn order(&self) -> usize {
        self.window.len()
    }

    pub fn actions(&self) -> &[Action] {
        &self.window
    }

    /// Number of floats the one-hot encoding of a window of `order` actions occupies.
    pub fn context_width(order: usize) -> usize {
        order * Action::COUNT
    }

    /// Records `action` as the newest entry; the oldest entry falls off.
    pub fn push(&mut self, action: Action) {
        if self.window.is_empty() {
            return;
        }
        self.window.rotate_right(1);
        self.window[0] = action;
    }

    /// Appends one one-hot block per window entry to `out`.
    pub fn encode_into(&self, out: &mut Vec<f32>) {
        for action in &self.window {
            let start = out.len();
            out.resize(start + Action::COUNT, 0.0);
            out[start + action.index()] = 1.0;
        }
    }
}
