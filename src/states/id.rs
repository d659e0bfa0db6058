use std::fmt;
use std::str::FromStr;

use crate::error::RuntimeError;

/// Identity of one state of the controller.
///
/// The set is closed: every id has exactly one handler in the
/// [`StatePool`](super::StatePool), checked at compile time by the pool's
/// exhaustive constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    /// Bootstrap state; leaves for `InMenu` on enter and is never revisited.
    Start,
    /// Menu is shown; apps can be started.
    InMenu,
    /// Nobody used the menu for a while; attract mode.
    Idle,
    /// One app is running in the foreground.
    InGame,
    /// Machine is suspended until the wake time.
    Sleep,
}

impl StateId {
    /// Every state id, in pool order.
    pub const ALL: [StateId; 5] = [
        StateId::Start,
        StateId::InMenu,
        StateId::Idle,
        StateId::InGame,
        StateId::Sleep,
    ];

    /// Number of states.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable name used in `ChangeState` payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateId::Start => "start",
            StateId::InMenu => "in_menu",
            StateId::Idle => "idle",
            StateId::InGame => "in_game",
            StateId::Sleep => "sleep",
        }
    }

    /// Position in [`StateId::ALL`].
    #[inline]
    pub(crate) fn index(&self) -> usize {
        match self {
            StateId::Start => 0,
            StateId::InMenu => 1,
            StateId::Idle => 2,
            StateId::InGame => 3,
            StateId::Sleep => 4,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateId {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| RuntimeError::UnknownState { name: s.to_string() })
    }
}
