use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Originating site of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "google_jobs", alias = "google")]
    GoogleJobs,
    #[serde(rename = "indeed")]
    Indeed,
}

impl Source {
    /// Every source this build knows how to collect from, in run order.
    pub const ALL: [Source; 2] = [Source::GoogleJobs, Source::Indeed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::GoogleJobs => "google_jobs",
            Source::Indeed => "indeed",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "google_jobs" => Ok(Source::GoogleJobs),
            "indeed" => Ok(Source::Indeed),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Best-effort field map produced by a Source Adapter for one listing.
///
/// Every field may be missing; required-field filtering happens after
/// normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJob {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub posted_date: Option<String>,
    pub job_description: Option<String>,
    pub apply_url: Option<String>,
}

/// A required [`JobRecord`] field that was missing or empty on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    JobTitle,
    CompanyName,
    Location,
    ApplyUrl,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::JobTitle => "jobTitle",
            RequiredField::CompanyName => "companyName",
            RequiredField::Location => "location",
            RequiredField::ApplyUrl => "applyUrl",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized listing that has not yet passed required-field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub job_description: String,
    pub apply_url: Option<String>,
    pub skills_extracted: BTreeSet<String>,
    pub source: Source,
    pub scraped_at: DateTime<Utc>,
}

impl Candidate {
    /// Promote the candidate to a [`JobRecord`].
    ///
    /// Fails on the first required field that is absent or blank. The apply
    /// URL must additionally parse as an absolute URL.
    pub fn into_record(self) -> Result<JobRecord, RequiredField> {
        let job_title = required(self.job_title, RequiredField::JobTitle)?;
        let company_name = required(self.company_name, RequiredField::CompanyName)?;
        let location = required(self.location, RequiredField::Location)?;
        let apply_url = required(self.apply_url, RequiredField::ApplyUrl)?;
        if Url::parse(&apply_url).is_err() {
            return Err(RequiredField::ApplyUrl);
        }

        Ok(JobRecord {
            job_title,
            company_name,
            location,
            posted_date: self.posted_date,
            job_description: self.job_description,
            apply_url,
            skills_extracted: self.skills_extracted,
            source: self.source,
            scraped_at: self.scraped_at,
        })
    }
}

fn required(value: Option<String>, field: RequiredField) -> Result<String, RequiredField> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(field),
    }
}

/// Canonical job listing emitted to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub job_description: String,
    pub apply_url: String,
    pub skills_extracted: BTreeSet<String>,
    pub source: Source,
    pub scraped_at: DateTime<Utc>,
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub saved: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub blocked_events: u64,
}

/// Anything the orchestrator hands to a [`crate::traits::Sink`].
///
/// Serializes as the bare job object, or as `{"_runStats": {...}}` for the
/// final summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Job(JobRecord),
    Stats {
        #[serde(rename = "_runStats")]
        run_stats: RunStats,
    },
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            job_title: Some("Data Analyst".into()),
            company_name: Some("Acme".into()),
            location: Some("Nairobi, Kenya".into()),
            posted_date: None,
            job_description: String::new(),
            apply_url: Some("https://jobs.acme.test/1".into()),
            skills_extracted: BTreeSet::new(),
            source: Source::Indeed,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_compute_hash_consistency() {
        let h1 = compute_hash("hello world");
        let h2 = compute_hash("hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_source_parsing_accepts_input_names() {
        assert_eq!("google".parse::<Source>().unwrap(), Source::GoogleJobs);
        assert_eq!("Google_Jobs".parse::<Source>().unwrap(), Source::GoogleJobs);
        assert_eq!("indeed".parse::<Source>().unwrap(), Source::Indeed);
        assert!("linkedin".parse::<Source>().is_err());

        let from_json: Vec<Source> = serde_json::from_str(r#"["google","indeed"]"#).unwrap();
        assert_eq!(from_json, vec![Source::GoogleJobs, Source::Indeed]);
    }

    #[test]
    fn test_complete_candidate_becomes_record() {
        let record = candidate().into_record().unwrap();
        assert_eq!(record.job_title, "Data Analyst");
        assert_eq!(record.source, Source::Indeed);
    }

    #[test]
    fn test_missing_apply_url_is_rejected() {
        let mut c = candidate();
        c.apply_url = None;
        assert_eq!(c.into_record().unwrap_err(), RequiredField::ApplyUrl);

        let mut c = candidate();
        c.apply_url = Some("/relative/path".into());
        assert_eq!(c.into_record().unwrap_err(), RequiredField::ApplyUrl);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut c = candidate();
        c.job_title = Some("   ".into());
        assert_eq!(c.into_record().unwrap_err(), RequiredField::JobTitle);
    }

    #[test]
    fn test_output_record_shapes() {
        let stats = OutputRecord::Stats {
            run_stats: RunStats {
                saved: 1,
                duplicates: 2,
                errors: 3,
                blocked_events: 4,
            },
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({
                "_runStats": {"saved": 1, "duplicates": 2, "errors": 3, "blockedEvents": 4}
            })
        );

        let job = OutputRecord::Job(candidate().into_record().unwrap());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["jobTitle"], "Data Analyst");
        assert_eq!(value["source"], "indeed");
        assert!(value["postedDate"].is_null());
    }
}
