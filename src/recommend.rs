//! Advice served to the storefront's bedtime mascot.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::types::{Category, Product};

/// How many products a recommendation carries.
pub const RECOMMENDATION_LIMIT: usize = 4;

/// Answer to "do you sleep hot or cold?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStyle {
    Hot,
    Cool,
    Balanced,
}

impl SleepStyle {
    pub fn message(self) -> &'static str {
        match self {
            SleepStyle::Hot => "Perfect! Our breathable cotton sheets will keep you cool all night. Let me show you!",
            SleepStyle::Cool => "Great! Our cozy flannel-feel sheets will keep you warm and comfortable.",
            SleepStyle::Balanced => "Excellent! Our premium cotton blend is perfect for year-round comfort.",
        }
    }

    /// Lowercase material fragments ranked first for this style.
    pub fn preferred_materials(self) -> &'static [&'static str] {
        match self {
            SleepStyle::Hot => &["cotton", "linen", "bamboo"],
            SleepStyle::Cool => &["flannel", "microfiber"],
            SleepStyle::Balanced => &["cotton blend", "organic"],
        }
    }
}

impl FromStr for SleepStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(SleepStyle::Hot),
            "cool" | "cold" => Ok(SleepStyle::Cool),
            "balanced" | "just-right" => Ok(SleepStyle::Balanced),
            other => Err(format!("unknown sleep style '{}'", other)),
        }
    }
}

impl fmt::Display for SleepStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SleepStyle::Hot => "hot",
            SleepStyle::Cool => "cool",
            SleepStyle::Balanced => "balanced",
        })
    }
}

/// Next category in the "complete the set" chain, with the mascot's line for it.
pub fn pairing_for(category: Category) -> (Category, &'static str) {
    match category {
        Category::Bedsheets => (
            Category::PillowCovers,
            "Great choice! Don't forget to check out our matching pillow covers for the complete look!",
        ),
        Category::PillowCovers => (
            Category::TableCovers,
            "Pillow covers that match your sheets create a harmonious bedroom! Want to complete the set?",
        ),
        Category::TableCovers => (
            Category::Bedsheets,
            "A complete bedroom set creates the perfect sleep environment! Mix and match or go for a coordinated look.",
        ),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecommendation {
    pub sleep_type: SleepStyle,
    pub message: &'static str,
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRecommendation {
    pub product_id: i64,
    pub message: &'static str,
    pub category: Category,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_styles() {
        assert_eq!("hot".parse::<SleepStyle>().unwrap(), SleepStyle::Hot);
        assert_eq!(" COOL ".parse::<SleepStyle>().unwrap(), SleepStyle::Cool);
        assert_eq!("balanced".parse::<SleepStyle>().unwrap(), SleepStyle::Balanced);
        assert!("lukewarm".parse::<SleepStyle>().is_err());
        assert!("".parse::<SleepStyle>().is_err());
    }

    #[test]
    fn chain_visits_every_category() {
        let mut c = Category::Bedsheets;
        let mut seen = Vec::new();
        for _ in 0..3 {
            c = pairing_for(c).0;
            seen.push(c);
        }
        assert_eq!(seen, vec![Category::PillowCovers, Category::TableCovers, Category::Bedsheets]);
    }

    #[test]
    fn serializes_sleep_type_lowercase() {
        let rec = SleepRecommendation {
            sleep_type: SleepStyle::Hot,
            message: SleepStyle::Hot.message(),
            category: Category::Bedsheets,
            products: vec![],
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["sleepType"], "hot");
        assert_eq!(v["category"], "bedsheets");
    }
}
