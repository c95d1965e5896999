use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Report tier: how many top frequencies a participant gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    One,
    Three,
    Seven,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Three, Tier::Seven];

    /// Number of ranked frequencies disclosed at this tier.
    pub fn rank(self) -> usize {
        match self {
            Tier::One => 1,
            Tier::Three => 3,
            Tier::Seven => 7,
        }
    }

    pub fn is_max(self) -> bool {
        self == Tier::Seven
    }

    /// Tiers that can still be purchased from this one.
    pub fn upgrades(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().filter(move |t| *t > self)
    }

    pub fn pricing(self) -> &'static TierPricing {
        match self {
            Tier::One => &TIER_CATALOG[0],
            Tier::Three => &TIER_CATALOG[1],
            Tier::Seven => &TIER_CATALOG[2],
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::One
    }
}

impl TryFrom<u8> for Tier {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            3 => Ok(Tier::Three),
            7 => Ok(Tier::Seven),
            other => Err(Error::BadRequest(format!("Unknown tier: {}", other))),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.rank() as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPricing {
    pub tier: Tier,
    pub name: &'static str,
    pub price_cents: u32,
    pub features: &'static [&'static str],
}

impl TierPricing {
    pub fn price_display(&self) -> String {
        if self.price_cents == 0 {
            "Free".to_string()
        } else {
            format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
        }
    }
}

pub static TIER_CATALOG: [TierPricing; 3] = [
    TierPricing {
        tier: Tier::One,
        name: "Core Frequency",
        price_cents: 0,
        features: &["Your dominant frequency", "One-page summary report"],
    },
    TierPricing {
        tier: Tier::Three,
        name: "Frequency Trio",
        price_cents: 1900,
        features: &[
            "Your top three frequencies",
            "Detailed description of each frequency",
            "Downloadable PDF report",
        ],
    },
    TierPricing {
        tier: Tier::Seven,
        name: "Full Spectrum",
        price_cents: 3900,
        features: &[
            "All seven frequencies ranked",
            "Detailed description of each frequency",
            "Complete score chart",
            "Downloadable PDF report",
        ],
    },
];
