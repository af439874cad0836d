//! Pure conversions from scraped strings to canonical record fields.
//!
//! Nothing in here fails: unparsable input simply yields `None` (or an empty
//! tag set) and the record moves on.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Candidate, RawJob, Source};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y", "%Y/%m/%d"];

static RELATIVE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\+?\s*(minute|min|hour|hr|day|week|month)s?\s+ago")
        .expect("valid relative age regex")
});

/// Parses a scraped date string into a UTC instant.
///
/// Accepts RFC 3339, RFC 2822 and a handful of common calendar layouts.
/// Date-only values resolve to midnight UTC; naive date-times are read as UTC.
pub fn normalize_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }
    None
}

/// Like [`normalize_timestamp`], but also resolves listing ages such as
/// "Posted 3 days ago", "30+ days ago", "Today" or "Just posted" against `now`.
pub fn normalize_timestamp_at(raw: Option<&str>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(ts) = normalize_timestamp(raw) {
        return Some(ts);
    }

    let lowered = raw?.trim().to_lowercase();
    if lowered.contains("just posted") || lowered.contains("just now") || lowered.ends_with("today")
    {
        return Some(now);
    }
    if lowered.ends_with("yesterday") {
        return Some(now - Duration::days(1));
    }

    let caps = RELATIVE_AGE.captures(&lowered)?;
    let amount: i64 = caps[1].parse().ok()?;
    let age = match &caps[2] {
        "minute" | "min" => Duration::try_minutes(amount)?,
        "hour" | "hr" => Duration::try_hours(amount)?,
        "day" => Duration::try_days(amount)?,
        "week" => Duration::try_weeks(amount)?,
        _ => Duration::try_days(amount.checked_mul(30)?)?,
    };
    now.checked_sub_signed(age)
}

/// Collapses whitespace runs to one space and trims the ends.
///
/// Purely textual: no geocoding, no region resolution.
pub fn canonicalize_location(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// One configured skill: a case-insensitive regex and the tag it yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSpec {
    pub name: String,
    pub pattern: String,
}

impl SkillSpec {
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// Built-in skill list used when the run input does not provide one.
pub fn default_skill_specs() -> Vec<SkillSpec> {
    vec![
        SkillSpec::new("python", "python"),
        SkillSpec::new("sql", "sql"),
        SkillSpec::new("javascript", "javascript"),
        SkillSpec::new("react", "react"),
        SkillSpec::new("node.js", r"node\.?js"),
        SkillSpec::new("aws", "aws"),
        SkillSpec::new("docker", "docker"),
    ]
}

#[derive(Debug)]
struct CompiledSkill {
    name: String,
    regex: Regex,
}

/// Matches free text against the configured skill patterns.
///
/// Patterns match anywhere in the text (no implicit word boundaries), so a
/// skill embedded in a longer token still counts.
#[derive(Debug, Clone)]
pub struct SkillMatcher {
    skills: Arc<Vec<CompiledSkill>>,
}

impl SkillMatcher {
    pub fn new(specs: &[SkillSpec]) -> Result<Self, AppError> {
        let skills = specs
            .iter()
            .map(|spec| {
                RegexBuilder::new(&spec.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledSkill {
                        name: spec.name.clone(),
                        regex,
                    })
                    .map_err(|e| {
                        AppError::ConfigError(format!("invalid skill pattern '{}': {e}", spec.name))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skills: Arc::new(skills),
        })
    }

    /// Tags whose pattern occurs in `text`. Absent text matches nothing.
    pub fn extract(&self, text: Option<&str>) -> BTreeSet<String> {
        let text = text.unwrap_or_default();
        self.skills
            .iter()
            .filter(|skill| skill.regex.is_match(text))
            .map(|skill| skill.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(&default_skill_specs()).expect("valid built-in skill patterns")
    }
}

/// Turns one raw extractor result into a candidate record stamped with its
/// source and scrape time.
pub fn normalize_raw(
    raw: RawJob,
    source: Source,
    skills: &SkillMatcher,
    scraped_at: DateTime<Utc>,
) -> Candidate {
    let skills_extracted = skills.extract(raw.job_description.as_deref());

    Candidate {
        job_title: raw.job_title.map(|s| s.trim().to_string()),
        company_name: raw.company_name.map(|s| s.trim().to_string()),
        location: canonicalize_location(raw.location.as_deref()),
        posted_date: normalize_timestamp_at(raw.posted_date.as_deref(), scraped_at),
        job_description: raw.job_description.unwrap_or_default(),
        apply_url: raw.apply_url.map(|s| s.trim().to_string()),
        skills_extracted,
        source,
        scraped_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_canonicalize_location_collapses_whitespace() {
        assert_eq!(
            canonicalize_location(Some(" Nairobi   ,  Kenya ")),
            Some("Nairobi , Kenya".to_string())
        );
        assert_eq!(
            canonicalize_location(Some("New\tYork,\n NY")),
            Some("New York, NY".to_string())
        );
    }

    #[test]
    fn test_canonicalize_location_handles_absent_and_blank() {
        assert_eq!(canonicalize_location(None), None);
        assert_eq!(canonicalize_location(Some("")), None);
        assert_eq!(canonicalize_location(Some("   \t ")), None);
    }

    #[test]
    fn test_normalize_timestamp_date_only() {
        let ts = normalize_timestamp(Some("2024-01-15")).unwrap();
        assert!(ts.to_rfc3339().starts_with("2024-01-15"));
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 15));
    }

    #[test]
    fn test_normalize_timestamp_other_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(normalize_timestamp(Some("03/05/2024")), Some(expected));
        assert_eq!(normalize_timestamp(Some("March 5, 2024")), Some(expected));
        assert_eq!(normalize_timestamp(Some("Mar 5, 2024")), Some(expected));
        assert_eq!(
            normalize_timestamp(Some("2024-03-05T10:30:00+02:00")),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap())
        );
        assert_eq!(
            normalize_timestamp(Some("Tue, 5 Mar 2024 10:30:00 GMT")),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_normalize_timestamp_rejects_garbage() {
        assert_eq!(normalize_timestamp(Some("not a date")), None);
        assert_eq!(normalize_timestamp(Some("")), None);
        assert_eq!(normalize_timestamp(Some("2024-13-45")), None);
        assert_eq!(normalize_timestamp(None), None);
    }

    #[test]
    fn test_relative_ages_resolve_against_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(
            normalize_timestamp_at(Some("3 days ago"), now),
            Some(now - Duration::days(3))
        );
        assert_eq!(
            normalize_timestamp_at(Some("Posted 30+ days ago"), now),
            Some(now - Duration::days(30))
        );
        assert_eq!(
            normalize_timestamp_at(Some("22 hours ago"), now),
            Some(now - Duration::hours(22))
        );
        assert_eq!(normalize_timestamp_at(Some("Just posted"), now), Some(now));
        assert_eq!(normalize_timestamp_at(Some("Today"), now), Some(now));
        assert_eq!(
            normalize_timestamp_at(Some("yesterday"), now),
            Some(now - Duration::days(1))
        );
        assert_eq!(normalize_timestamp_at(Some("whenever"), now), None);
        assert_eq!(normalize_timestamp_at(None, now), None);
    }

    #[test]
    fn test_extract_skills_detects_known_skills() {
        let matcher = SkillMatcher::default();
        let skills =
            matcher.extract(Some("Looking for Python and SQL developer with AWS experience"));
        assert!(skills.contains("python"));
        assert!(skills.contains("sql"));
        assert!(skills.contains("aws"));
        assert_eq!(skills.len(), 3);
    }

    #[test]
    fn test_extract_skills_is_case_insensitive() {
        let matcher = SkillMatcher::default();
        let skills = matcher.extract(Some("PYTHON, JavaScript, and DOCKER required; NodeJS a plus"));
        assert!(skills.contains("python"));
        assert!(skills.contains("javascript"));
        assert!(skills.contains("docker"));
        assert!(skills.contains("node.js"));
    }

    #[test]
    fn test_extract_skills_matches_inside_words() {
        let matcher = SkillMatcher::default();
        assert!(matcher.extract(Some("MySQL administrator")).contains("sql"));
    }

    #[test]
    fn test_extract_skills_empty_for_no_matches() {
        let matcher = SkillMatcher::default();
        assert!(matcher.extract(Some("Looking for a marketing specialist")).is_empty());
        assert!(matcher.extract(None).is_empty());
    }

    #[test]
    fn test_repeated_mentions_collapse_to_one_tag() {
        let matcher = SkillMatcher::default();
        let skills = matcher.extract(Some("python python PYTHON"));
        assert_eq!(skills.into_iter().collect::<Vec<_>>(), vec!["python"]);
    }

    #[test]
    fn test_default_matcher_compiles_every_builtin() {
        assert_eq!(SkillMatcher::default().len(), default_skill_specs().len());
    }

    #[test]
    fn test_custom_skills_and_invalid_pattern() {
        let matcher = SkillMatcher::new(&[SkillSpec::new("rust", r"\brust\b")]).unwrap();
        assert!(matcher.extract(Some("Senior Rust engineer")).contains("rust"));
        assert!(matcher.extract(Some("trusted partner")).is_empty());

        let err = SkillMatcher::new(&[SkillSpec::new("broken", "(")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_normalize_raw_stamps_source_and_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let raw = RawJob {
            job_title: Some("  Data Analyst ".into()),
            company_name: Some("Acme".into()),
            location: Some(" Nairobi   ,  Kenya ".into()),
            posted_date: Some("2024-06-01".into()),
            job_description: Some("SQL and Python daily".into()),
            apply_url: Some("https://acme.test/apply".into()),
        };

        let candidate = normalize_raw(raw, Source::GoogleJobs, &SkillMatcher::default(), now);
        assert_eq!(candidate.job_title.as_deref(), Some("Data Analyst"));
        assert_eq!(candidate.location.as_deref(), Some("Nairobi , Kenya"));
        assert_eq!(
            candidate.posted_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(candidate.source, Source::GoogleJobs);
        assert_eq!(candidate.scraped_at, now);
        assert!(candidate.skills_extracted.contains("sql"));
        assert!(candidate.skills_extracted.contains("python"));
    }
}
