use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Source;
use crate::normalize::{SkillMatcher, SkillSpec, default_skill_specs};
use crate::traits::SearchRequest;

fn default_max_results() -> usize {
    100
}

fn default_rate_limit_rpm() -> u32 {
    30
}

fn default_sources() -> Vec<Source> {
    Source::ALL.to_vec()
}

fn default_proxy() -> bool {
    true
}

/// Run input, as read from the JSON input document.
///
/// Every field is optional; missing fields take the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default)]
    pub search_queries: Vec<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-source request budget, in requests per minute.
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,

    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,

    /// Route traffic through the configured proxy endpoint.
    #[serde(default = "default_proxy")]
    pub proxy: bool,

    /// Overrides the built-in skill patterns when present.
    #[serde(default)]
    pub skills: Option<Vec<SkillSpec>>,
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            search_queries: Vec::new(),
            location: None,
            max_results: default_max_results(),
            rate_limit_rpm: default_rate_limit_rpm(),
            sources: default_sources(),
            proxy: default_proxy(),
            skills: None,
        }
    }
}

impl RunInput {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let input: RunInput = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigError(format!("invalid run input: {e}")))?;
        input.validate()?;
        Ok(input)
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("cannot read input {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.rate_limit_rpm == 0 {
            return Err(AppError::ConfigError(
                "rateLimitRpm must be at least 1".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(AppError::ConfigError("maxResults must be at least 1".into()));
        }
        self.skill_matcher()?;
        Ok(())
    }

    /// Enabled sources in run order, duplicates removed.
    pub fn enabled_sources(&self) -> Vec<Source> {
        let mut enabled = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if !enabled.contains(source) {
                enabled.push(*source);
            }
        }
        enabled
    }

    /// One request per non-blank query, in input order.
    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.search_queries
            .iter()
            .filter_map(|q| {
                let query = q.trim();
                if query.is_empty() {
                    tracing::warn!("skipping blank search query");
                    return None;
                }
                Some(SearchRequest {
                    query: query.to_string(),
                    location: self
                        .location
                        .as_deref()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    max_results: self.max_results,
                })
            })
            .collect()
    }

    pub fn skill_matcher(&self) -> Result<SkillMatcher, AppError> {
        match &self.skills {
            Some(specs) => SkillMatcher::new(specs),
            None => SkillMatcher::new(&default_skill_specs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let input = RunInput::from_json("{}").unwrap();
        assert!(input.search_queries.is_empty());
        assert_eq!(input.location, None);
        assert_eq!(input.max_results, 100);
        assert_eq!(input.rate_limit_rpm, 30);
        assert_eq!(input.sources, vec![Source::GoogleJobs, Source::Indeed]);
        assert!(input.proxy);
        assert_eq!(input, RunInput::default());
    }

    #[test]
    fn parses_camel_case_fields() {
        let input = RunInput::from_json(
            r#"{
                "searchQueries": ["data analyst", "  "],
                "location": " Nairobi ",
                "maxResults": 5,
                "rateLimitRpm": 10,
                "sources": ["indeed", "indeed", "google"],
                "proxy": false
            }"#,
        )
        .unwrap();

        assert_eq!(input.enabled_sources(), vec![Source::Indeed, Source::GoogleJobs]);
        assert!(!input.proxy);

        let requests = input.search_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, "data analyst");
        assert_eq!(requests[0].location.as_deref(), Some("Nairobi"));
        assert_eq!(requests[0].max_results, 5);
    }

    #[test]
    fn rejects_zero_budgets() {
        let err = RunInput::from_json(r#"{"rateLimitRpm": 0}"#).unwrap_err();
        assert!(err.to_string().contains("rateLimitRpm"));
        let err = RunInput::from_json(r#"{"maxResults": 0}"#).unwrap_err();
        assert!(err.to_string().contains("maxResults"));
    }

    #[test]
    fn rejects_unknown_sources_and_bad_skills() {
        assert!(RunInput::from_json(r#"{"sources": ["monster"]}"#).is_err());
        assert!(
            RunInput::from_json(r#"{"skills": [{"name": "bad", "pattern": "["}]}"#).is_err()
        );
    }

    #[test]
    fn custom_skills_replace_builtins() {
        let input = RunInput::from_json(r#"{"skills": [{"name": "go", "pattern": "golang"}]}"#)
            .unwrap();
        let matcher = input.skill_matcher().unwrap();
        assert_eq!(matcher.len(), 1);
        assert!(matcher.extract(Some("Python and Golang")).contains("go"));
        assert!(!matcher.extract(Some("Python and Golang")).contains("python"));
    }
}
