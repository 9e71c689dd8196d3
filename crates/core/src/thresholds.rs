//! Threshold configuration for the dashboard report.
//!
//! Weight tiers partition a customer's monthly spend and recency schemes partition the days
//! elapsed since a customer's latest order in a month. Both are validated once when they are
//! constructed, so the report stages can treat classification as a total function.

use std::collections::HashSet;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of boundaries in every recency scheme.
pub const SCHEME_BOUNDARY_COUNT: usize = 4;

/// Number of buckets a recency scheme produces (`<=b1` .. `<=b4`, `>b4`).
pub const BUCKET_COUNT: usize = SCHEME_BOUNDARY_COUNT + 1;

pub const DEFAULT_BASE_DATE: &str = "2024-12-31T23:59:59+09:00";

/// `DEFAULT_BASE_DATE` as epoch milliseconds.
pub const DEFAULT_BASE_DATE_MS: i64 = 1_735_657_199_000;

pub const DEFAULT_WEIGHT_TIERS: [(&str, u64); 4] =
    [("super_heavy", 2000), ("heavy", 1000), ("light", 500), ("super_light", 0)];

pub const DEFAULT_RECENCY_SCHEMES: [[u32; SCHEME_BOUNDARY_COUNT]; 4] =
    [[7, 14, 21, 30], [14, 30, 45, 60], [30, 60, 90, 120], [60, 120, 180, 240]];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("weight tier list must not be empty")]
    EmptyTiers,
    #[error("weight tier #{index} has an empty name")]
    UnnamedTier { index: usize },
    #[error("weight tier `{0}` is declared more than once")]
    DuplicateTier(String),
    #[error(
        "weight tier `{tier}` (>{bound}) must have a lower bound below `{previous}` (>{previous_bound})"
    )]
    TiersNotDescending { previous: String, previous_bound: u64, tier: String, bound: u64 },
    #[error("last weight tier `{tier}` must be a catch-all with lower bound 0, found {bound}")]
    MissingCatchAll { tier: String, bound: u64 },
    #[error("recency scheme {boundaries:?} must have exactly 4 boundaries")]
    SchemeLength { boundaries: Vec<u32> },
    #[error("recency scheme {boundaries:?} must be strictly increasing")]
    SchemeNotIncreasing { boundaries: Vec<u32> },
    #[error("recency scheme key `{0}` is declared more than once")]
    DuplicateScheme(String),
    #[error("base date `{value}` is not an RFC 3339 instant")]
    InvalidBaseDate { value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTier {
    pub name: String,
    /// Exclusive lower bound, except on the catch-all tier where it is 0 inclusive.
    pub lower_bound: u64,
}

impl WeightTier {
    pub fn new(name: impl Into<String>, lower_bound: u64) -> Self {
        Self { name: name.into(), lower_bound }
    }
}

/// Weight tiers ordered from the highest bound down to the catch-all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightTiers {
    ranked: Vec<WeightTier>,
    catch_all: WeightTier,
}

impl WeightTiers {
    pub fn new(mut tiers: Vec<WeightTier>) -> Result<Self, ThresholdError> {
        let Some(catch_all) = tiers.pop() else {
            return Err(ThresholdError::EmptyTiers);
        };

        let mut seen = HashSet::new();
        for (index, tier) in tiers.iter().chain(std::iter::once(&catch_all)).enumerate() {
            if tier.name.trim().is_empty() {
                return Err(ThresholdError::UnnamedTier { index });
            }
            if !seen.insert(tier.name.as_str()) {
                return Err(ThresholdError::DuplicateTier(tier.name.clone()));
            }
        }

        let ordered: Vec<&WeightTier> = tiers.iter().chain(std::iter::once(&catch_all)).collect();
        for pair in ordered.windows(2) {
            if pair[1].lower_bound >= pair[0].lower_bound {
                return Err(ThresholdError::TiersNotDescending {
                    previous: pair[0].name.clone(),
                    previous_bound: pair[0].lower_bound,
                    tier: pair[1].name.clone(),
                    bound: pair[1].lower_bound,
                });
            }
        }

        if catch_all.lower_bound != 0 {
            return Err(ThresholdError::MissingCatchAll {
                tier: catch_all.name,
                bound: catch_all.lower_bound,
            });
        }

        Ok(Self { ranked: tiers, catch_all })
    }

    /// Returns the first tier whose bound the amount strictly exceeds, else the catch-all.
    pub fn classify(&self, amount: u64) -> &WeightTier {
        self.ranked.iter().find(|tier| amount > tier.lower_bound).unwrap_or(&self.catch_all)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightTier> {
        self.ranked.iter().chain(std::iter::once(&self.catch_all))
    }

    pub fn len(&self) -> usize {
        self.ranked.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for WeightTiers {
    fn default() -> Self {
        let mut tiers: Vec<WeightTier> = DEFAULT_WEIGHT_TIERS
            .iter()
            .map(|(name, lower_bound)| WeightTier::new(*name, *lower_bound))
            .collect();
        let catch_all = tiers.pop().unwrap_or_else(|| WeightTier::new("super_light", 0));
        Self { ranked: tiers, catch_all }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecencyScheme {
    boundaries: [u32; SCHEME_BOUNDARY_COUNT],
}

impl RecencyScheme {
    pub fn new(boundaries: &[u32]) -> Result<Self, ThresholdError> {
        let boundaries: [u32; SCHEME_BOUNDARY_COUNT] = boundaries
            .try_into()
            .map_err(|_| ThresholdError::SchemeLength { boundaries: boundaries.to_vec() })?;

        if boundaries.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ThresholdError::SchemeNotIncreasing { boundaries: boundaries.to_vec() });
        }

        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> [u32; SCHEME_BOUNDARY_COUNT] {
        self.boundaries
    }

    /// Report key for this scheme, named after its first boundary (`7week`).
    pub fn key(&self) -> String {
        format!("{}week", self.boundaries[0])
    }

    /// 1-based bucket for an elapsed day count; `<=` against each boundary, else the last bucket.
    pub fn bucket(&self, elapsed_days: u64) -> usize {
        self.boundaries
            .iter()
            .position(|boundary| elapsed_days <= u64::from(*boundary))
            .map_or(BUCKET_COUNT, |index| index + 1)
    }
}

fn default_recency_schemes() -> Vec<RecencyScheme> {
    DEFAULT_RECENCY_SCHEMES
        .iter()
        .map(|boundaries| RecencyScheme { boundaries: *boundaries })
        .collect()
}

/// Everything the report stages need besides the orders themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportThresholds {
    weight_tiers: WeightTiers,
    recency_schemes: Vec<RecencyScheme>,
    base_date_ms: i64,
}

impl ReportThresholds {
    pub fn new(
        weight_tiers: WeightTiers,
        recency_schemes: Vec<RecencyScheme>,
        base_date_ms: i64,
    ) -> Result<Self, ThresholdError> {
        let mut keys = HashSet::new();
        for scheme in &recency_schemes {
            let key = scheme.key();
            if !keys.insert(key.clone()) {
                return Err(ThresholdError::DuplicateScheme(key));
            }
        }

        Ok(Self { weight_tiers, recency_schemes, base_date_ms })
    }

    /// Builds thresholds from raw configuration values.
    pub fn from_parts(
        weight_tiers: Vec<WeightTier>,
        recency_schemes: &[Vec<u32>],
        base_date: &str,
    ) -> Result<Self, ThresholdError> {
        let weight_tiers = WeightTiers::new(weight_tiers)?;
        let recency_schemes = recency_schemes
            .iter()
            .map(|boundaries| RecencyScheme::new(boundaries))
            .collect::<Result<Vec<_>, _>>()?;
        let base_date_ms = parse_base_date(base_date)?;

        Self::new(weight_tiers, recency_schemes, base_date_ms)
    }

    pub fn weight_tiers(&self) -> &WeightTiers {
        &self.weight_tiers
    }

    pub fn recency_schemes(&self) -> &[RecencyScheme] {
        &self.recency_schemes
    }

    pub fn base_date_ms(&self) -> i64 {
        self.base_date_ms
    }

    pub fn with_base_date_ms(mut self, base_date_ms: i64) -> Self {
        self.base_date_ms = base_date_ms;
        self
    }
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            weight_tiers: WeightTiers::default(),
            recency_schemes: default_recency_schemes(),
            base_date_ms: DEFAULT_BASE_DATE_MS,
        }
    }
}

pub fn parse_base_date(value: &str) -> Result<i64, ThresholdError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.timestamp_millis())
        .map_err(|_| ThresholdError::InvalidBaseDate { value: value.to_string() })
}
