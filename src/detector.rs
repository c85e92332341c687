use crate::config::{Category, ScoringConfig};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Scores at or above this are classified as phishing.
pub const PHISHING_THRESHOLD: u32 = 40;

/// Upper clamp for the aggregated risk score.
pub const MAX_RISK_SCORE: u32 = 100;

/// URL tokens start with http(s):// and run through letters, digits, the
/// literal characters $ - _ @ . & + ! * ( ) , and %XX hex escapes. Matching
/// stops at the first character outside that set, so a path separator ends
/// the token.
const URL_PATTERN: &str = r"https?://(?:[a-zA-Z0-9$@.&+!*(),_-]|%[0-9a-fA-F]{2})+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a clamped risk score. Boundaries are inclusive on the lower
    /// bound, evaluated descending, first match wins.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 75 => RiskLevel::High,
            s if s >= PHISHING_THRESHOLD => RiskLevel::Medium,
            s if s >= 20 => RiskLevel::Low,
            _ => RiskLevel::Safe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "Safe",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matched items and contribution score for one category (or for "urls").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailEntry {
    pub found: Vec<String>,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_phishing: bool,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub details: HashMap<String, DetailEntry>,
    /// Set when analysis hit an internal fault and fell back to the
    /// zero-score sentinel. Distinguishes a soft failure from a genuine
    /// Safe verdict, which carry the same numeric score.
    #[serde(default)]
    pub degraded: bool,
}

impl AnalysisResult {
    /// Zero-score sentinel returned when analysis cannot complete. Callers
    /// never see an error from `analyze`; they see this shape instead.
    pub fn degraded(message: &str) -> Self {
        AnalysisResult {
            is_phishing: false,
            risk_score: 0,
            risk_level: RiskLevel::Safe,
            reasons: vec![format!("Error analyzing email: {message}")],
            details: HashMap::new(),
            degraded: true,
        }
    }

    fn empty_input() -> Self {
        AnalysisResult {
            is_phishing: false,
            risk_score: 0,
            risk_level: RiskLevel::Safe,
            reasons: vec!["No content to analyze".to_string()],
            details: HashMap::new(),
            degraded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStatus {
    pub category: Category,
    pub keyword_count: usize,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub categories: Vec<CategoryStatus>,
    pub total_keywords: usize,
    pub suspicious_domains: usize,
}

/// The heuristic scoring engine.
///
/// Holds only immutable configuration after construction; `analyze` allocates
/// per call and mutates nothing shared, so the engine is reentrant and safe
/// to share across threads.
pub struct ScoringEngine {
    config: ScoringConfig,
    url_regex: Regex,
}

impl ScoringEngine {
    pub fn new(mut config: ScoringConfig) -> Result<Self> {
        config.normalize();
        config.validate()?;
        let url_regex = Regex::new(URL_PATTERN)?;
        Ok(ScoringEngine { config, url_regex })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Analyze one email body. Never fails: internal faults degrade to the
    /// zero-score sentinel carrying a diagnostic reason.
    pub fn analyze(&self, email_text: &str) -> AnalysisResult {
        match self.analyze_inner(email_text) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Analysis degraded: {e}");
                AnalysisResult::degraded(&e.to_string())
            }
        }
    }

    fn analyze_inner(&self, email_text: &str) -> Result<AnalysisResult> {
        if email_text.trim().is_empty() {
            return Ok(AnalysisResult::empty_input());
        }

        let text = email_text.to_lowercase();
        let mut risk_score: u32 = 0;
        let mut reasons = Vec::new();
        let mut details = HashMap::new();

        let suspicious_urls = self.suspicious_urls(&text);
        if !suspicious_urls.is_empty() {
            let score = suspicious_urls.len() as u32 * self.config.url_weight;
            risk_score += score;
            reasons.push(format!(
                "🔗 Found {} suspicious URL(s)",
                suspicious_urls.len()
            ));
            details.insert(
                "urls".to_string(),
                DetailEntry {
                    found: suspicious_urls,
                    score,
                },
            );
        }

        for rule in &self.config.categories {
            let found: Vec<String> = rule
                .keywords
                .iter()
                .filter(|keyword| text.contains(keyword.as_str()))
                .cloned()
                .collect();
            if found.is_empty() {
                continue;
            }
            let score = found.len() as u32 * rule.weight;
            risk_score += score;
            reasons.push(format!(
                "{} {}: {}",
                rule.category.emoji(),
                rule.category.label(),
                found.join(", ")
            ));
            details.insert(rule.category.as_str().to_string(), DetailEntry { found, score });
        }

        let risk_score = risk_score.min(MAX_RISK_SCORE);
        log::debug!(
            "Scored email at {risk_score} across {} matched group(s)",
            details.len()
        );

        Ok(AnalysisResult {
            is_phishing: risk_score >= PHISHING_THRESHOLD,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            reasons,
            details,
            degraded: false,
        })
    }

    /// Extract URL tokens from already-lowercased text and keep the ones
    /// containing a suspicious-domain token. Non-suspicious URLs are neither
    /// reported nor scored.
    fn suspicious_urls(&self, text: &str) -> Vec<String> {
        self.url_regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|url| {
                self.config
                    .suspicious_domains
                    .iter()
                    .any(|token| url.contains(token.as_str()))
            })
            .collect()
    }

    /// Introspection over the loaded dictionaries. Pure.
    pub fn status(&self) -> EngineStatus {
        let categories: Vec<CategoryStatus> = self
            .config
            .categories
            .iter()
            .map(|rule| CategoryStatus {
                category: rule.category,
                keyword_count: rule.keywords.len(),
                weight: rule.weight,
            })
            .collect();
        let total_keywords = categories.iter().map(|c| c.keyword_count).sum();
        EngineStatus {
            categories,
            total_keywords,
            suspicious_domains: self.config.suspicious_domains.len(),
        }
    }
}
