use aedoom_core::{Action, ActionSink, Decision};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Game keys an action can hold down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    Use,
}

impl Key {
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Left => Some(Self::LeftArrow),
            Action::Right => Some(Self::RightArrow),
            Action::Forward => Some(Self::UpArrow),
            Action::Backward => Some(Self::DownArrow),
            Action::None => None,
            Action::Activate => Some(Self::Use),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftArrow => "left_arrow",
            Self::RightArrow => "right_arrow",
            Self::UpArrow => "up_arrow",
            Self::DownArrow => "down_arrow",
            Self::Use => "use",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "key", rename_all = "snake_case")]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down(key) => write!(f, "down {}", key.as_str()),
            Self::Up(key) => write!(f, "up {}", key.as_str()),
        }
    }
}

/// Turns decisions into key presses: release the held key, then press the new one.
///
/// Repeating the held action emits nothing. Disabling the sink releases the held key and
/// drops decisions until it is enabled again.
pub struct KeyEventSink<W> {
    out: W,
    held: Option<Key>,
    enabled: bool,
    emitted: u64,
}

impl<W: Write> KeyEventSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            held: None,
            enabled: true,
            emitted: 0,
        }
    }

    pub fn held(&self) -> Option<Key> {
        self.held
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Key events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.enabled == enabled {
            return Ok(());
        }
        self.enabled = enabled;
        tracing::info!(enabled, "auto control toggled");
        if !enabled {
            if let Some(key) = self.held.take() {
                self.write(KeyEvent::Up(key))?;
            }
        }
        Ok(())
    }

    /// Moves the held key to whatever `action` maps to.
    pub fn press(&mut self, action: Action) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let next = Key::for_action(action);
        if next == self.held {
            return Ok(());
        }
        if let Some(key) = self.held.take() {
            self.write(KeyEvent::Up(key))?;
        }
        if let Some(key) = next {
            self.write(KeyEvent::Down(key))?;
            self.held = Some(key);
        }
        Ok(())
    }

    fn write(&mut self, event: KeyEvent) -> Result<()> {
        writeln!(self.out, "{event}").context("failed writing key event")?;
        self.emitted += 1;
        Ok(())
    }
}

impl<W: Write> ActionSink for KeyEventSink<W> {
    type Error = anyhow::Error;

    fn emit(&mut self, decision: &Decision) -> Result<()> {
        self.press(decision.action)
    }
}
