use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// The closed set of keyword categories the scorer knows about.
///
/// Each category carries a fixed display label and emoji used when building
/// the human-readable reasons list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Urgency,
    Sensitive,
    Financial,
    Threat,
    Prize,
}

impl Category {
    /// Fixed declaration order; reasons follow this order in every result.
    pub const ALL: [Category; 5] = [
        Category::Urgency,
        Category::Sensitive,
        Category::Financial,
        Category::Threat,
        Category::Prize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Urgency => "urgency",
            Category::Sensitive => "sensitive",
            Category::Financial => "financial",
            Category::Threat => "threat",
            Category::Prize => "prize",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Urgency => "Urgency",
            Category::Sensitive => "Sensitive",
            Category::Financial => "Financial",
            Category::Threat => "Threat",
            Category::Prize => "Prize",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Urgency => "⚡",
            Category::Sensitive => "🔒",
            Category::Financial => "💰",
            Category::Threat => "⚠️",
            Category::Prize => "🎁",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword group sharing a single weight.
///
/// Keywords are literal lowercase substrings, not word-boundary patterns:
/// "account" matches inside "accounts" and inside a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    pub category: Category,
    pub weight: u32,
    pub keywords: Vec<String>,
}

/// Scoring configuration handed to [`crate::ScoringEngine::new`].
///
/// Defaults to the canonical dictionaries; a reduced table can be supplied
/// for testing or loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Score added per suspicious URL.
    #[serde(default = "default_url_weight")]
    pub url_weight: u32,
    pub categories: Vec<CategoryRule>,
    /// Lowercase tokens that flag a URL as suspicious when contained in it.
    pub suspicious_domains: Vec<String>,
}

fn default_url_weight() -> u32 {
    20
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            url_weight: default_url_weight(),
            categories: vec![
                CategoryRule {
                    category: Category::Urgency,
                    weight: 15,
                    keywords: to_strings(&[
                        "urgent",
                        "immediate",
                        "now",
                        "verify",
                        "suspended",
                        "locked",
                        "security",
                        "unusual",
                        "unauthorized",
                        "limited time",
                        "warning",
                        "alert",
                        "attention",
                        "action required",
                        "expire",
                        "deadline",
                    ]),
                },
                CategoryRule {
                    category: Category::Sensitive,
                    weight: 20,
                    keywords: to_strings(&[
                        "password",
                        "credit card",
                        "social security",
                        "ssn",
                        "account",
                        "login",
                        "bank",
                        "verify",
                        "confirm",
                        "validate",
                        "credentials",
                        "sign in",
                        "username",
                        "pin",
                        "security question",
                    ]),
                },
                CategoryRule {
                    category: Category::Financial,
                    weight: 15,
                    keywords: to_strings(&[
                        "money",
                        "cash",
                        "payment",
                        "wire",
                        "transfer",
                        "transaction",
                        "bank",
                        "account",
                        "credit",
                        "debit",
                        "fund",
                        "dollar",
                        "$",
                        "bitcoin",
                        "crypto",
                        "wallet",
                        "deposit",
                        "refund",
                    ]),
                },
                CategoryRule {
                    category: Category::Threat,
                    weight: 20,
                    keywords: to_strings(&[
                        "suspended",
                        "terminated",
                        "deleted",
                        "blocked",
                        "limited",
                        "closed",
                        "reported",
                        "unauthorized",
                        "suspicious",
                        "disabled",
                        "restricted",
                        "violation",
                        "security breach",
                        "compromised",
                    ]),
                },
                CategoryRule {
                    category: Category::Prize,
                    weight: 25,
                    keywords: to_strings(&[
                        "won",
                        "winner",
                        "prize",
                        "reward",
                        "congratulation",
                        "selected",
                        "lottery",
                        "claim",
                        "free",
                        "gift",
                        "bonus",
                        "exclusive offer",
                    ]),
                },
            ],
            suspicious_domains: to_strings(&[
                "secure",
                "account",
                "banking",
                "verify",
                "update",
                "login",
                "confirm",
                "support",
                "security",
                "service",
            ]),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl ScoringConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ScoringConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Lowercase every keyword and domain token in place.
    ///
    /// Matching runs against lowercased text, so the dictionaries must be
    /// lowercase themselves. Called by the engine before validation.
    pub fn normalize(&mut self) {
        for rule in &mut self.categories {
            for keyword in &mut rule.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        for token in &mut self.suspicious_domains {
            *token = token.to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url_weight == 0 {
            bail!("url_weight must be positive");
        }
        if self.categories.is_empty() {
            bail!("At least one category rule is required");
        }
        let mut seen_categories = HashSet::new();
        for rule in &self.categories {
            if !seen_categories.insert(rule.category) {
                bail!("Duplicate category rule: {}", rule.category);
            }
            if rule.weight == 0 {
                bail!("Category '{}' must have a positive weight", rule.category);
            }
            if rule.keywords.is_empty() {
                bail!("Category '{}' has an empty keyword list", rule.category);
            }
            let mut seen_keywords = HashSet::new();
            for keyword in &rule.keywords {
                if keyword.is_empty() {
                    bail!("Category '{}' contains an empty keyword", rule.category);
                }
                if !seen_keywords.insert(keyword.as_str()) {
                    bail!(
                        "Category '{}' contains duplicate keyword '{}'",
                        rule.category,
                        keyword
                    );
                }
            }
        }
        for token in &self.suspicious_domains {
            if token.is_empty() {
                bail!("Suspicious domain list contains an empty token");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_dictionary_sizes() {
        let config = ScoringConfig::default();
        let counts: Vec<usize> = config.categories.iter().map(|r| r.keywords.len()).collect();
        assert_eq!(counts, vec![16, 15, 18, 14, 12]);
        assert_eq!(config.suspicious_domains.len(), 10);
        assert_eq!(config.url_weight, 20);
    }

    #[test]
    fn test_category_declaration_order() {
        let config = ScoringConfig::default();
        let order: Vec<Category> = config.categories.iter().map(|r| r.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
    }

    #[test]
    fn test_rejects_zero_weight() {
        let mut config = ScoringConfig::default();
        config.categories[0].weight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_keyword_list() {
        let mut config = ScoringConfig::default();
        config.categories[2].keywords.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_keyword() {
        let mut config = ScoringConfig::default();
        config.categories[0].keywords.push("urgent".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let mut config = ScoringConfig::default();
        let dup = config.categories[0].clone();
        config.categories.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_url_weight() {
        let mut config = ScoringConfig::default();
        config.url_weight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_lowercases_dictionaries() {
        let mut config = ScoringConfig {
            url_weight: 20,
            categories: vec![CategoryRule {
                category: Category::Urgency,
                weight: 15,
                keywords: vec!["URGENT".to_string()],
            }],
            suspicious_domains: vec!["SECURE".to_string()],
        };
        config.normalize();
        assert_eq!(config.categories[0].keywords, vec!["urgent"]);
        assert_eq!(config.suspicious_domains, vec!["secure"]);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ScoringConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ScoringConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.categories.len(), config.categories.len());
        assert_eq!(parsed.suspicious_domains, config.suspicious_domains);
    }
}
