//! Level-up detection across successive level snapshots.

use crate::leveling::{LevelCurve, LevelSnapshot};
use crate::types::Quest;
use serde::{Deserialize, Serialize};

/// An upward level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

impl LevelUp {
    pub fn levels_gained(&self) -> u32 {
        self.to - self.from
    }

    pub fn is_multi_level(&self) -> bool {
        self.levels_gained() > 1
    }

    /// Headline announcing the new level.
    pub fn message(&self) -> String {
        format!("LEVEL UP! You reached Level {}!", self.to)
    }

    /// Follow-up line for jumps spanning several levels.
    pub fn multi_level_message(&self) -> Option<String> {
        self.is_multi_level()
            .then(|| format!("You gained {} levels! Amazing progress!", self.levels_gained()))
    }
}

/// Remembers the last observed level and reports when it goes up.
///
/// One notifier covers one observation session. The first observation only
/// records a baseline.
#[derive(Debug, Clone, Default)]
pub struct LevelUpNotifier {
    previous: Option<u32>,
    curve: Option<LevelCurve>,
}

impl LevelUpNotifier {
    /// Notifier on the default curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that computes snapshots on a specific curve.
    pub fn with_curve(curve: LevelCurve) -> Self {
        Self {
            previous: None,
            curve: Some(curve),
        }
    }

    /// Notifier that starts from a known level instead of waiting for a baseline.
    pub fn with_baseline(level: u32) -> Self {
        Self {
            previous: Some(level),
            curve: None,
        }
    }

    /// Last observed level, if any.
    pub fn previous_level(&self) -> Option<u32> {
        self.previous
    }

    /// Record a snapshot; returns a level-up when the level rose since the last one.
    pub fn observe(&mut self, snapshot: &LevelSnapshot) -> Option<LevelUp> {
        let current = snapshot.level;
        let event = match self.previous {
            Some(previous) if current > previous => Some(LevelUp {
                from: previous,
                to: current,
            }),
            _ => None,
        };

        self.previous = Some(current);
        if let Some(level_up) = &event {
            log::info!("Level up: {} -> {}", level_up.from, level_up.to);
        }
        event
    }

    /// Recompute the snapshot for a quest list and observe it.
    pub fn observe_quests(&mut self, quests: &[Quest]) -> (LevelSnapshot, Option<LevelUp>) {
        let snapshot = match &self.curve {
            Some(curve) => curve.snapshot_for(quests),
            None => LevelCurve::standard().snapshot_for(quests),
        };
        let event = self.observe(&snapshot);
        (snapshot, event)
    }
}
