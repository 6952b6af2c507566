//! Feature extraction and encoding
//!
//! Turns raw box score rows into season-average features and matchup context.

pub mod context;
pub mod engineer;
pub mod names;
pub mod scoring;
pub mod season;

pub use context::{MatchContext, Tier, TierTable};
pub use engineer::{FeatureEngineer, FeatureRow};
pub use names::short_name;
pub use scoring::ScoringRules;
pub use season::{PlayerKey, PlayerProfile, SeasonAverages};
