//! TF-IDF similarity ranking of identifiers scraped from page markup.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Default cut-off; scores must be strictly above it.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

static ATTRIBUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(id|class)\s*=\s*"([^"]*)""#).expect("attribute pattern compiles")
});

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern compiles"));

/// Attribute an identifier was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierSource {
    Id,
    Class,
}

/// One `id="…"`/`class="…"` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub value: String,
    pub source: IdentifierSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub value: String,
    pub source: IdentifierSource,
    pub score: f64,
}

/// Scan `markup` for id and class attribute values in appearance order.
///
/// The attribute name must follow whitespace, so `data-testid="x"` is not an
/// id. A multi-token class attribute stays one combined string. Empty values
/// are skipped.
pub fn extract_identifiers(markup: &str) -> Vec<Identifier> {
    ATTRIBUTE_PATTERN
        .captures_iter(markup)
        .filter_map(|caps| {
            let value = caps.get(2)?.as_str();
            if value.trim().is_empty() {
                return None;
            }
            let source = if caps[1].eq_ignore_ascii_case("id") {
                IdentifierSource::Id
            } else {
                IdentifierSource::Class
            };
            Some(Identifier {
                value: value.to_string(),
                source,
            })
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

type SparseVector = BTreeMap<String, f64>;

/// Smoothed-idf model fitted over a small corpus.
struct TfIdf {
    idf: BTreeMap<String, f64>,
}

impl TfIdf {
    fn fit(documents: &[Vec<String>]) -> Self {
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            let mut seen: Vec<&str> = doc.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_default() += 1;
            }
        }
        let n = documents.len() as f64;
        let idf = df
            .into_iter()
            .map(|(term, count)| {
                let weight = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
                (term.to_string(), weight)
            })
            .collect();
        Self { idf }
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut vector = SparseVector::new();
        for token in tokens {
            *vector.entry(token.clone()).or_insert(0.0) += 1.0;
        }
        for (term, weight) in vector.iter_mut() {
            *weight *= self.idf.get(term).copied().unwrap_or(0.0);
        }
        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    dot.clamp(0.0, 1.0)
}

/// Ranks scraped identifiers by similarity to a failed locator value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityRanker {
    threshold: f64,
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityRanker {
    /// `threshold` is validated by [`HealConfig`](crate::HealConfig).
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every scraped identifier, unfiltered, in extraction order.
    pub fn score_all(&self, original: &str, markup: &str) -> Vec<RankedCandidate> {
        let identifiers = extract_identifiers(markup);
        if identifiers.is_empty() {
            return Vec::new();
        }

        let mut documents = Vec::with_capacity(identifiers.len() + 1);
        documents.push(tokenize(original));
        documents.extend(identifiers.iter().map(|ident| tokenize(&ident.value)));

        let model = TfIdf::fit(&documents);
        let query = model.vectorize(&documents[0]);

        identifiers
            .into_iter()
            .zip(documents.iter().skip(1))
            .map(|(ident, tokens)| RankedCandidate {
                score: cosine(&query, &model.vectorize(tokens)),
                value: ident.value,
                source: ident.source,
            })
            .collect()
    }

    /// Candidates scoring strictly above the threshold, best first.
    ///
    /// Ties keep extraction order. A value scraped more than once is
    /// reported at its first position only.
    pub fn rank(&self, original: &str, markup: &str) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = Vec::new();
        for candidate in self.score_all(original, markup) {
            if candidate.score > self.threshold
                && !ranked.iter().any(|r| r.value == candidate.value)
            {
                ranked.push(candidate);
            }
        }
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <div id="search-box-container">
          <img class="logo" src="/logo.png">
          <a class="footer-link" href="/about">About</a>
        </div>"#;

    #[test]
    fn extracts_in_appearance_order() {
        let markup = r#"<a class="btn primary" id="go"></a><span data-testid="skip" id=""></span><p ID="Upper">"#;
        let idents = extract_identifiers(markup);
        let values: Vec<_> = idents.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["btn primary", "go", "Upper"]);
        assert_eq!(idents[0].source, IdentifierSource::Class);
        assert_eq!(idents[1].source, IdentifierSource::Id);
    }

    #[test]
    fn search_box_ranks_container_only() {
        let ranker = SimilarityRanker::default();
        let ranked = ranker.rank("search-box", SEARCH_PAGE);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].value, "search-box-container");
        assert_eq!(ranked[0].source, IdentifierSource::Id);
        assert!(ranked[0].score > 0.7, "score {}", ranked[0].score);
        assert!((ranked[0].score - 0.7445).abs() < 1e-3, "score {}", ranked[0].score);
    }

    #[test]
    fn unfiltered_scores_stay_in_unit_range() {
        let scores = SimilarityRanker::default().score_all("search-box", SEARCH_PAGE);
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        assert_eq!(scores[1].score, 0.0);
        assert_eq!(scores[2].score, 0.0);
    }

    #[test]
    fn exact_match_scores_one_and_sorts_first() {
        let markup = r#"<div class="login-form"></div><input id="login">"#;
        let ranked = SimilarityRanker::new(0.1).rank("login", markup);
        assert_eq!(ranked[0].value, "login");
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
        assert_eq!(ranked[1].value, "login-form");
    }

    #[test]
    fn threshold_is_strict() {
        let markup = r#"<input id="login">"#;
        assert!(SimilarityRanker::new(1.0).rank("login", markup).is_empty());
    }

    #[test]
    fn no_tokens_means_no_candidates() {
        let ranker = SimilarityRanker::new(0.0);
        assert!(ranker.rank("#", SEARCH_PAGE).is_empty());
        assert!(ranker.rank("search-box", "<p>plain</p>").is_empty());
    }

    #[test]
    fn ranking_is_repeatable() {
        let ranker = SimilarityRanker::new(0.2);
        let markup = r#"<a id="nav-search"></a><b class="search box"></b><i id="box-search"></i>"#;
        let first = ranker.rank("search box", markup);
        for _ in 0..5 {
            assert_eq!(ranker.rank("search box", markup), first);
        }
    }
}
