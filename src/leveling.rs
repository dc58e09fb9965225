//! XP leveling engine.
//!
//! Maps accumulated experience to a level on a geometric curve. The marginal
//! cost of level `n` (for `n >= 2`) is `floor(base_xp * growth_rate^(n - 2))`;
//! the cumulative threshold for a level is the sum of those floored terms, so
//! thresholds are always summed term by term rather than taken from a closed
//! form.
//!
//! Everything here is pure: no I/O, no shared mutable state, no error path.
//! Out-of-range input (negative totals, levels past the ceiling) is clamped.
//!
//! # Example
//!
//! ```
//! use questlog::leveling::{calculate_level, level_title};
//!
//! let snapshot = calculate_level(105);
//! assert_eq!(snapshot.level, 2);
//! assert_eq!(snapshot.xp_for_next_level, 220);
//! assert_eq!(level_title(snapshot.level), "Novice");
//! ```

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Cumulative XP required to reach level 2.
pub const BASE_XP: u64 = 100;

/// Multiplicative growth of the marginal XP cost per level.
pub const GROWTH_RATE: f64 = 1.2;

/// Hard level ceiling.
pub const MAX_LEVEL: u32 = 100;

/// Largest `max_level` a config may ask for; the threshold table is sized by it.
pub const MAX_LEVEL_LIMIT: u32 = 10_000;

static STANDARD_CURVE: LazyLock<LevelCurve> = LazyLock::new(|| LevelCurve::new(LevelConfig::default()));

/// Tunable parameters of the XP curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// XP required to go from level 1 to level 2
    pub base_xp: u64,

    /// Growth factor applied to each further level's cost
    pub growth_rate: f64,

    /// Highest reachable level
    pub max_level: u32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            base_xp: BASE_XP,
            growth_rate: GROWTH_RATE,
            max_level: MAX_LEVEL,
        }
    }
}

impl LevelConfig {
    /// Check that the parameters describe a usable curve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_xp == 0 {
            return Err(ConfigError::ZeroBaseXp);
        }
        if !self.growth_rate.is_finite() || self.growth_rate <= 0.0 {
            return Err(ConfigError::InvalidGrowthRate(self.growth_rate));
        }
        if self.max_level == 0 {
            return Err(ConfigError::ZeroMaxLevel);
        }
        if self.max_level > MAX_LEVEL_LIMIT {
            return Err(ConfigError::MaxLevelTooHigh(self.max_level));
        }
        Ok(())
    }

    /// XP needed to advance from `level - 1` to `level`.
    fn marginal_xp(&self, level: u32) -> u64 {
        if level < 2 {
            return 0;
        }
        // Float-to-int casts saturate, so overflowing terms pin at u64::MAX
        (self.base_xp as f64 * self.growth_rate.powf(f64::from(level - 2))).floor() as u64
    }
}

/// Errors from an invalid [`LevelConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroBaseXp,
    InvalidGrowthRate(f64),
    ZeroMaxLevel,
    MaxLevelTooHigh(u32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroBaseXp => write!(f, "base_xp must be greater than 0"),
            ConfigError::InvalidGrowthRate(rate) => {
                write!(f, "growth_rate must be a positive finite number, got {}", rate)
            }
            ConfigError::ZeroMaxLevel => write!(f, "max_level must be at least 1"),
            ConfigError::MaxLevelTooHigh(level) => {
                write!(f, "max_level must be at most {}, got {}", MAX_LEVEL_LIMIT, level)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Precomputed cumulative thresholds for every level up to the ceiling.
#[derive(Debug, Clone)]
pub struct LevelCurve {
    config: LevelConfig,
    /// `thresholds[level]` = cumulative XP to reach `level`; index 0 is unused
    thresholds: Vec<u64>,
}

impl LevelCurve {
    /// Build the threshold table for a config.
    ///
    /// `max_level` is clamped into `1..=MAX_LEVEL_LIMIT`; use
    /// [`LevelConfig::validate`] to reject such configs instead.
    pub fn new(config: LevelConfig) -> Self {
        let max_level = config.max_level.clamp(1, MAX_LEVEL_LIMIT);
        let mut thresholds = Vec::with_capacity(max_level as usize + 1);
        thresholds.push(0);
        thresholds.push(0);

        let mut total: u64 = 0;
        for level in 2..=max_level {
            total = total.saturating_add(config.marginal_xp(level));
            thresholds.push(total);
        }

        Self { config, thresholds }
    }

    /// The curve for the default parameters, built once per process.
    pub fn standard() -> &'static LevelCurve {
        &STANDARD_CURVE
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn max_level(&self) -> u32 {
        self.config.max_level.clamp(1, MAX_LEVEL_LIMIT)
    }

    /// Cumulative XP required to reach `level`. Zero for levels 0 and 1.
    ///
    /// Levels above [`MAX_LEVEL_LIMIT`] can never be configured and report
    /// `u64::MAX`.
    pub fn xp_for_level(&self, level: u32) -> u64 {
        if let Some(xp) = self.thresholds.get(level as usize) {
            return *xp;
        }
        if level > MAX_LEVEL_LIMIT {
            return u64::MAX;
        }

        // Past the ceiling: keep summing the same floored terms
        let mut total = self.thresholds.last().copied().unwrap_or(0);
        for next in (self.thresholds.len() as u32)..=level {
            if total == u64::MAX {
                break;
            }
            total = total.saturating_add(self.config.marginal_xp(next));
        }
        total
    }

    /// Resolve a total XP value into a full progression snapshot.
    ///
    /// Negative totals are treated as zero.
    pub fn snapshot(&self, total_xp: i64) -> LevelSnapshot {
        let total_xp = total_xp.max(0) as u64;
        let max_level = self.max_level();

        let mut level = 1;
        while level < max_level && total_xp >= self.thresholds[level as usize + 1] {
            level += 1;
        }

        let is_max_level = level >= max_level;
        let xp_for_current_level = self.thresholds[level as usize];
        let xp_for_next_level = if is_max_level {
            xp_for_current_level
        } else {
            self.thresholds[level as usize + 1]
        };

        let xp_in_current_level = total_xp.saturating_sub(xp_for_current_level);
        let xp_needed_for_next = xp_for_next_level - xp_for_current_level;
        let progress_percentage = if is_max_level || xp_needed_for_next == 0 {
            100.0
        } else {
            ((xp_in_current_level as f64 / xp_needed_for_next as f64) * 100.0).min(100.0)
        };

        LevelSnapshot {
            level,
            total_xp,
            xp_for_current_level,
            xp_for_next_level,
            xp_in_current_level,
            xp_needed_for_next,
            progress_percentage,
            is_max_level,
        }
    }

    /// Snapshot for a set of records, counting only completed ones.
    pub fn snapshot_for<'a, R>(&self, records: impl IntoIterator<Item = &'a R>) -> LevelSnapshot
    where
        R: XpSource + 'a,
    {
        self.snapshot(total_xp(records))
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new(LevelConfig::default())
    }
}

/// Derived progression state for one XP total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Current level, 1..=max level
    pub level: u32,

    /// XP total the snapshot was computed from (after clamping)
    pub total_xp: u64,

    /// Cumulative threshold of the current level
    pub xp_for_current_level: u64,

    /// Cumulative threshold of the next level (equal to current at max level)
    pub xp_for_next_level: u64,

    pub xp_in_current_level: u64,

    pub xp_needed_for_next: u64,

    /// Progress towards the next level, 0-100
    pub progress_percentage: f64,

    pub is_max_level: bool,
}

impl LevelSnapshot {
    pub fn tier(&self) -> Tier {
        Tier::from_level(self.level)
    }

    pub fn title(&self) -> &'static str {
        self.tier().title()
    }

    /// The level being worked towards, if any.
    pub fn next_level(&self) -> Option<u32> {
        (!self.is_max_level).then_some(self.level + 1)
    }
}

/// Decade-wide level bands sharing a title and a color tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Novice,
    Apprentice,
    Adventurer,
    Explorer,
    Warrior,
    Guardian,
    Champion,
    Hero,
    Legend,
    Mythic,
}

/// Inclusive upper level bound of each tier, in ascending order.
const TIER_BOUNDS: [(u32, Tier); 10] = [
    (10, Tier::Novice),
    (20, Tier::Apprentice),
    (30, Tier::Adventurer),
    (40, Tier::Explorer),
    (50, Tier::Warrior),
    (60, Tier::Guardian),
    (70, Tier::Champion),
    (80, Tier::Hero),
    (90, Tier::Legend),
    (100, Tier::Mythic),
];

impl Tier {
    /// Bucket a level; anything past the last bound lands in the top tier.
    pub fn from_level(level: u32) -> Self {
        TIER_BOUNDS
            .iter()
            .find(|(upper, _)| level <= *upper)
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::Mythic)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tier::Novice => "Novice",
            Tier::Apprentice => "Apprentice",
            Tier::Adventurer => "Adventurer",
            Tier::Explorer => "Explorer",
            Tier::Warrior => "Warrior",
            Tier::Guardian => "Guardian",
            Tier::Champion => "Champion",
            Tier::Hero => "Hero",
            Tier::Legend => "Legend",
            Tier::Mythic => "Mythic",
        }
    }

    /// Categorical color tag for presentation layers.
    pub fn color_tag(&self) -> &'static str {
        match self {
            Tier::Novice => "gray",
            Tier::Apprentice => "green",
            Tier::Adventurer => "blue",
            Tier::Explorer => "purple",
            Tier::Warrior => "yellow",
            Tier::Guardian => "orange",
            Tier::Champion => "red",
            Tier::Hero => "pink",
            Tier::Legend => "indigo",
            Tier::Mythic => "amber",
        }
    }
}

/// Anything that can contribute XP: a completion flag and a reward.
pub trait XpSource {
    fn is_complete(&self) -> bool;

    /// Reward granted on completion; `None` counts as zero.
    fn reward_xp(&self) -> Option<i64>;
}

impl XpSource for (bool, i64) {
    fn is_complete(&self) -> bool {
        self.0
    }

    fn reward_xp(&self) -> Option<i64> {
        Some(self.1)
    }
}

impl XpSource for (bool, Option<i64>) {
    fn is_complete(&self) -> bool {
        self.0
    }

    fn reward_xp(&self) -> Option<i64> {
        self.1
    }
}

/// Sum the rewards of completed records. Never negative.
pub fn total_xp<'a, R>(records: impl IntoIterator<Item = &'a R>) -> i64
where
    R: XpSource + 'a,
{
    records
        .into_iter()
        .filter(|r| r.is_complete())
        .fold(0i64, |total, r| total.saturating_add(r.reward_xp().unwrap_or(0)))
        .max(0)
}

/// Cumulative XP required to reach `level` on the default curve.
pub fn xp_for_level(level: u32) -> u64 {
    LevelCurve::standard().xp_for_level(level)
}

/// Resolve a total XP value on the default curve.
pub fn calculate_level(total_xp: i64) -> LevelSnapshot {
    LevelCurve::standard().snapshot(total_xp)
}

pub fn level_tier(level: u32) -> Tier {
    Tier::from_level(level)
}

pub fn level_title(level: u32) -> &'static str {
    Tier::from_level(level).title()
}

pub fn level_color(level: u32) -> &'static str {
    Tier::from_level(level).color_tag()
}
