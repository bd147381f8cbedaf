//! Knowledge Store leaf
//!
//! Deterministic in-process index over the knowledge-base articles.
//! Scoring is keyword overlap: the fraction of query keywords found in
//! an article's text, with a small boost for topic hits. Identical
//! article snapshots therefore rank identically across runs, which the
//! idempotence guarantees depend on.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;

/// Default passage count when the caller does not ask for a k
pub const DEFAULT_TOP_K: usize = 3;

/// Boost added when the query touches the article topic
const TOPIC_BOOST: f64 = 0.1;

/// Minimum keyword length considered for matching
const MIN_KEYWORD_LEN: usize = 3;

/// Resolution guideline attached to an article
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Guideline {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub conditions: String,
}

/// One row of `knowledge_base.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KBArticle {
    pub id: String,
    pub topic: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub applies_to_plans: Vec<String>,
    #[serde(default)]
    pub guideline: Guideline,
}

/// Scored retrieval hit returned to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KBPassage {
    pub article_id: String,
    pub topic: String,
    pub excerpt: String,
    pub category: String,
    pub applies_to_plans: Vec<String>,
    pub guideline: Guideline,
    pub relevance_score: f64,
}

/// Read-only article index; immutable after load, safe to share
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    articles: Vec<IndexedArticle>,
}

#[derive(Debug, Clone)]
struct IndexedArticle {
    article: KBArticle,
    haystack: String,
    topic_haystack: String,
}

impl KnowledgeStore {
    /// Load `knowledge_base.json` from the data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(data_dir.join("knowledge_base.json"))?;
        let articles: Vec<KBArticle> = serde_json::from_str(&raw)?;
        Ok(Self::from_articles(articles))
    }

    /// Build directly from articles, used by tests and frozen snapshots
    pub fn from_articles(articles: Vec<KBArticle>) -> Self {
        let articles = articles
            .into_iter()
            .map(|article| IndexedArticle {
                haystack: format!("{}\n{}", article.topic, article.content).to_lowercase(),
                topic_haystack: article.topic.to_lowercase(),
                article,
            })
            .collect();
        Self { articles }
    }

    /// Top-k passages for a query: score descending, article id ascending
    /// on ties, empty when nothing matches
    pub fn search(&self, query: &str, k: usize) -> Vec<KBPassage> {
        let keywords = extract_keywords(query);
        if keywords.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut hits: Vec<KBPassage> = self
            .articles
            .iter()
            .filter_map(|indexed| {
                let score = score_article(&keywords, indexed);
                if score > 0.0 {
                    Some(passage_from(indexed, score))
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article_id.cmp(&b.article_id))
        });
        hits.truncate(k);
        hits
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Lowercased alphanumeric tokens of at least `MIN_KEYWORD_LEN` chars
fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_KEYWORD_LEN)
        .map(|w| w.to_string())
        .collect();
    keywords.sort();
    keywords.dedup();
    keywords
}

fn score_article(keywords: &[String], indexed: &IndexedArticle) -> f64 {
    let matched = keywords
        .iter()
        .filter(|kw| indexed.haystack.contains(kw.as_str()))
        .count();
    if matched == 0 {
        return 0.0;
    }

    let mut score = matched as f64 / keywords.len() as f64;
    if keywords.iter().any(|kw| indexed.topic_haystack.contains(kw.as_str())) {
        score += TOPIC_BOOST;
    }

    round4(score.min(1.0))
}

fn passage_from(indexed: &IndexedArticle, score: f64) -> KBPassage {
    let article = &indexed.article;
    KBPassage {
        article_id: article.id.clone(),
        topic: article.topic.clone(),
        excerpt: article.content.clone(),
        category: article.category.clone(),
        applies_to_plans: article.applies_to_plans.clone(),
        guideline: article.guideline.clone(),
        relevance_score: score,
    }
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
