//! Healing configuration
//!
//! [`HealConfig`] is the serde-facing shape (snake_case or camelCase keys);
//! [`HealConfig::validate`] turns it into the [`HealSettings`] the resolver runs on.

use serde::{Deserialize, Serialize};

use healkit_core_types::Locator;

use crate::errors::ConfigError;
use crate::similarity::{
    IdentifierSource, RankedCandidate, SimilarityRanker, DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::strategies::{StrategyGenerator, StrategyKind};

pub const DEFAULT_NOMINAL_STRATEGY_SCORE: f64 = 0.8;
pub const DEFAULT_ELEMENT_NAME: &str = "unnamed-element";

/// How a ranked identifier becomes a CSS locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedSelector {
    /// The scraped value itself is the selector.
    #[default]
    Literal,
    /// `#value` for ids, `.a.b` for class lists.
    Attribute,
}

impl RankedSelector {
    pub fn locator_for(&self, candidate: &RankedCandidate) -> Locator {
        match (self, candidate.source) {
            (RankedSelector::Literal, _) => Locator::css(candidate.value.clone()),
            (RankedSelector::Attribute, IdentifierSource::Id) => {
                Locator::css(format!("#{}", candidate.value))
            }
            (RankedSelector::Attribute, IdentifierSource::Class) => {
                let classes: Vec<&str> = candidate.value.split_whitespace().collect();
                Locator::css(format!(".{}", classes.join(".")))
            }
        }
    }
}

/// User-facing healing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealConfig {
    #[serde(alias = "healingEnabled")]
    pub healing_enabled: bool,
    #[serde(alias = "similarityEnabled")]
    pub similarity_enabled: bool,
    #[serde(alias = "similarityThreshold")]
    pub similarity_threshold: f64,
    #[serde(alias = "strategyOrder")]
    pub strategy_order: Vec<String>,
    #[serde(alias = "nominalStrategyScore")]
    pub nominal_strategy_score: f64,
    #[serde(alias = "rankedSelector")]
    pub ranked_selector: RankedSelector,
    #[serde(alias = "defaultElementName")]
    pub default_element_name: String,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            healing_enabled: true,
            similarity_enabled: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            strategy_order: StrategyKind::DEFAULT_ORDER
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
            nominal_strategy_score: DEFAULT_NOMINAL_STRATEGY_SCORE,
            ranked_selector: RankedSelector::default(),
            default_element_name: DEFAULT_ELEMENT_NAME.to_string(),
        }
    }
}

/// Validated form of [`HealConfig`] the resolver runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct HealSettings {
    pub healing_enabled: bool,
    pub similarity_enabled: bool,
    pub nominal_strategy_score: f64,
    pub ranked_selector: RankedSelector,
    pub default_element_name: String,
    pub generator: StrategyGenerator,
    pub ranker: SimilarityRanker,
}

impl Default for HealSettings {
    fn default() -> Self {
        Self {
            healing_enabled: true,
            similarity_enabled: true,
            nominal_strategy_score: DEFAULT_NOMINAL_STRATEGY_SCORE,
            ranked_selector: RankedSelector::default(),
            default_element_name: DEFAULT_ELEMENT_NAME.to_string(),
            generator: StrategyGenerator::default(),
            ranker: SimilarityRanker::default(),
        }
    }
}

fn unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

impl HealConfig {
    pub fn validate(&self) -> Result<HealSettings, ConfigError> {
        if !unit_interval(self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(self.similarity_threshold));
        }
        if !unit_interval(self.nominal_strategy_score) {
            return Err(ConfigError::InvalidNominalScore(self.nominal_strategy_score));
        }
        if self.default_element_name.trim().is_empty() {
            return Err(ConfigError::BlankElementName);
        }
        if self.strategy_order.is_empty() {
            return Err(ConfigError::EmptyStrategyOrder);
        }

        let mut order: Vec<StrategyKind> = Vec::with_capacity(self.strategy_order.len());
        for name in &self.strategy_order {
            let strategy: StrategyKind = name.parse()?;
            if order.contains(&strategy) {
                return Err(ConfigError::DuplicateStrategy(name.clone()));
            }
            order.push(strategy);
        }

        Ok(HealSettings {
            healing_enabled: self.healing_enabled,
            similarity_enabled: self.similarity_enabled,
            nominal_strategy_score: self.nominal_strategy_score,
            ranked_selector: self.ranked_selector,
            default_element_name: self.default_element_name.clone(),
            generator: StrategyGenerator::new(order),
            ranker: SimilarityRanker::new(self.similarity_threshold),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_to_default_settings() {
        let settings = HealConfig::default().validate().unwrap();
        assert_eq!(settings, HealSettings::default());
        assert_eq!(settings.generator.order().len(), 8);
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let config = HealConfig {
            similarity_threshold: 1.5,
            ..HealConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(1.5)));

        let config = HealConfig {
            similarity_threshold: f64::NAN,
            ..HealConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        let config = HealConfig {
            nominal_strategy_score: -0.1,
            ..HealConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidNominalScore(-0.1)));
    }

    #[test]
    fn rejects_bad_strategy_orders() {
        let empty = HealConfig {
            strategy_order: vec![],
            ..HealConfig::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyStrategyOrder));

        let duplicated = HealConfig {
            strategy_order: vec!["css_id".into(), "css-id".into()],
            ..HealConfig::default()
        };
        assert_eq!(
            duplicated.validate(),
            Err(ConfigError::DuplicateStrategy("css-id".into()))
        );

        let unknown = HealConfig {
            strategy_order: vec!["link_text".into()],
            ..HealConfig::default()
        };
        assert_eq!(
            unknown.validate(),
            Err(ConfigError::UnknownStrategy("link_text".into()))
        );
    }

    #[test]
    fn custom_order_is_kept() {
        let config = HealConfig {
            strategy_order: vec!["xpath_id".into(), "id".into()],
            ..HealConfig::default()
        };
        let settings = config.validate().unwrap();
        assert_eq!(
            settings.generator.order(),
            &[StrategyKind::XpathId, StrategyKind::Id]
        );
    }

    #[test]
    fn ranked_selector_styles() {
        let id = RankedCandidate {
            value: "search-box".into(),
            source: IdentifierSource::Id,
            score: 0.9,
        };
        let class = RankedCandidate {
            value: "btn  primary".into(),
            source: IdentifierSource::Class,
            score: 0.9,
        };
        assert_eq!(RankedSelector::Literal.locator_for(&id), Locator::css("search-box"));
        assert_eq!(RankedSelector::Attribute.locator_for(&id), Locator::css("#search-box"));
        assert_eq!(RankedSelector::Literal.locator_for(&class), Locator::css("btn  primary"));
        assert_eq!(
            RankedSelector::Attribute.locator_for(&class),
            Locator::css(".btn.primary")
        );
    }
}
