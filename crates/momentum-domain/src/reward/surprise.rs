use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::RandomSource;

/// Parameters of the surprise-effect resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurprisePolicy {
    pub points_min: i64,
    pub points_max: i64,
    pub badge_pool: Vec<String>,
    pub multiplier_factor: f64,
    pub multiplier_hours: i64,
}

impl Default for SurprisePolicy {
    fn default() -> Self {
        Self {
            points_min: 10,
            points_max: 100,
            badge_pool: vec![
                "lucky_streak".to_string(),
                "night_owl".to_string(),
                "golden_keys".to_string(),
            ],
            multiplier_factor: 2.0,
            multiplier_hours: 24,
        }
    }
}

/// Concrete outcome chosen for a surprise claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurpriseEffect {
    Points { amount: i64 },
    Badge { badge_id: String },
    Multiplier { factor: f64, expires_at: DateTime<Utc> },
}

impl SurprisePolicy {
    /// Pick one of: random points, time-boxed multiplier, random badge
    pub fn resolve(&self, rng: &dyn RandomSource, now: DateTime<Utc>) -> SurpriseEffect {
        let options = if self.badge_pool.is_empty() { 2 } else { 3 };
        match rng.pick_index(options) {
            0 => SurpriseEffect::Points {
                amount: rng.range_inclusive(self.points_min, self.points_max),
            },
            1 => self.multiplier(self.multiplier_factor, now),
            _ => SurpriseEffect::Badge {
                badge_id: self.badge_pool[rng.pick_index(self.badge_pool.len())].clone(),
            },
        }
    }

    /// Time-boxed multiplier with a given factor
    pub fn multiplier(&self, factor: f64, now: DateTime<Utc>) -> SurpriseEffect {
        SurpriseEffect::Multiplier {
            factor,
            expires_at: now + Duration::hours(self.multiplier_hours),
        }
    }
}
