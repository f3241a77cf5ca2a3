//! Deterministic rewrite strategies
//!
//! Each strategy reinterprets the raw value of a failed locator under a
//! different locator kind:
//! 1. `id`, `name`, `class` - the value as-is under that kind
//! 2. `css_id`, `css_class` - `#value` / `.value`
//! 3. `xpath_id`, `xpath_name`, `xpath_class_contains` - attribute predicates

use std::fmt;
use std::str::FromStr;

use healkit_core_types::{Locator, LocatorKind};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Named rewrite of a failed locator's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Id,
    Name,
    Class,
    CssId,
    CssClass,
    XpathId,
    XpathName,
    XpathClassContains,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 8] = [
        StrategyKind::Id,
        StrategyKind::Name,
        StrategyKind::Class,
        StrategyKind::CssId,
        StrategyKind::CssClass,
        StrategyKind::XpathId,
        StrategyKind::XpathName,
        StrategyKind::XpathClassContains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Id => "id",
            StrategyKind::Name => "name",
            StrategyKind::Class => "class",
            StrategyKind::CssId => "css_id",
            StrategyKind::CssClass => "css_class",
            StrategyKind::XpathId => "xpath_id",
            StrategyKind::XpathName => "xpath_name",
            StrategyKind::XpathClassContains => "xpath_class_contains",
        }
    }

    /// Build the rewritten locator for `value`.
    ///
    /// The value is inserted verbatim; no quoting or escaping is applied.
    pub fn rewrite(&self, value: &str) -> Locator {
        match self {
            StrategyKind::Id => Locator::new(LocatorKind::Id, value),
            StrategyKind::Name => Locator::new(LocatorKind::Name, value),
            StrategyKind::Class => Locator::new(LocatorKind::Class, value),
            StrategyKind::CssId => Locator::css(format!("#{}", value)),
            StrategyKind::CssClass => Locator::css(format!(".{}", value)),
            StrategyKind::XpathId => Locator::xpath(format!("//*[@id='{}']", value)),
            StrategyKind::XpathName => Locator::xpath(format!("//*[@name='{}']", value)),
            StrategyKind::XpathClassContains => {
                Locator::xpath(format!("//*[contains(@class,'{}')]", value))
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        StrategyKind::DEFAULT_ORDER
            .iter()
            .copied()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownStrategy(raw.to_string()))
    }
}

/// A strategy applied to a failed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub strategy: StrategyKind,
    pub locator: Locator,
}

/// Produces the ordered deterministic candidates for a failed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyGenerator {
    order: Vec<StrategyKind>,
}

impl Default for StrategyGenerator {
    fn default() -> Self {
        Self {
            order: StrategyKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl StrategyGenerator {
    /// Use `order` as the strategy sequence. Callers validate the order
    /// (non-empty, no repeats) through [`HealConfig`](crate::HealConfig).
    pub fn new(order: Vec<StrategyKind>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[StrategyKind] {
        &self.order
    }

    /// Apply every strategy to `failed.value`, in order.
    ///
    /// Locators equal to `failed`, or to an earlier rewrite, are dropped.
    pub fn generate(&self, failed: &Locator) -> Vec<Rewrite> {
        let mut rewrites: Vec<Rewrite> = Vec::with_capacity(self.order.len());
        for strategy in &self.order {
            let locator = strategy.rewrite(&failed.value);
            if locator == *failed || rewrites.iter().any(|r| r.locator == locator) {
                continue;
            }
            rewrites.push(Rewrite {
                strategy: *strategy,
                locator,
            });
        }
        rewrites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locators(rewrites: &[Rewrite]) -> Vec<Locator> {
        rewrites.iter().map(|r| r.locator.clone()).collect()
    }

    #[test]
    fn id_failure_skips_identical_rewrite() {
        let generator = StrategyGenerator::default();
        let rewrites = generator.generate(&Locator::id("search_input"));

        assert_eq!(
            locators(&rewrites),
            vec![
                Locator::new(LocatorKind::Name, "search_input"),
                Locator::new(LocatorKind::Class, "search_input"),
                Locator::css("#search_input"),
                Locator::css(".search_input"),
                Locator::xpath("//*[@id='search_input']"),
                Locator::xpath("//*[@name='search_input']"),
                Locator::xpath("//*[contains(@class,'search_input')]"),
            ]
        );
        assert_eq!(rewrites[0].strategy, StrategyKind::Name);
    }

    #[test]
    fn generation_is_repeatable() {
        let generator = StrategyGenerator::default();
        let failed = Locator::new(LocatorKind::Name, "q_search");

        let first = generator.generate(&failed);
        let second = generator.generate(&failed);
        assert_eq!(first, second);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
        assert_eq!(first, StrategyGenerator::default().generate(&failed));
    }

    #[test]
    fn xpath_value_is_used_raw() {
        let failed = Locator::xpath("//button[@type='submit']");
        let rewrites = StrategyGenerator::default().generate(&failed);

        assert_eq!(rewrites.len(), 8);
        assert_eq!(
            rewrites[0].locator,
            Locator::id("//button[@type='submit']")
        );
        assert_eq!(
            rewrites[7].locator,
            Locator::xpath("//*[contains(@class,'//button[@type='submit']')]")
        );
    }

    #[test]
    fn css_failure_skips_matching_css_rewrite() {
        let failed = Locator::css("#x");
        let rewrites = StrategyGenerator::default().generate(&failed);
        // "##x" differs from "#x", so nothing is dropped here.
        assert_eq!(rewrites.len(), 8);

        let failed = Locator::css(".btn");
        let rewrites = StrategyGenerator::new(vec![StrategyKind::CssClass, StrategyKind::Id])
            .generate(&failed);
        assert_eq!(locators(&rewrites), vec![Locator::css("..btn"), Locator::id(".btn")]);
    }

    #[test]
    fn duplicate_rewrites_are_dropped() {
        let generator =
            StrategyGenerator::new(vec![StrategyKind::Name, StrategyKind::Name, StrategyKind::Id]);
        let rewrites = generator.generate(&Locator::css("q"));
        assert_eq!(
            locators(&rewrites),
            vec![Locator::new(LocatorKind::Name, "q"), Locator::id("q")]
        );
    }

    #[test]
    fn empty_value_still_yields_rewrites() {
        let rewrites = StrategyGenerator::default().generate(&Locator::id(""));
        assert_eq!(rewrites.len(), 7);
        assert_eq!(rewrites[2].locator, Locator::css("#"));
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(
            "xpath-class-contains".parse::<StrategyKind>().unwrap(),
            StrategyKind::XpathClassContains
        );
        assert_eq!("CSS_ID".parse::<StrategyKind>().unwrap(), StrategyKind::CssId);
        assert!(matches!(
            "by_text".parse::<StrategyKind>(),
            Err(ConfigError::UnknownStrategy(name)) if name == "by_text"
        ));
    }
}
