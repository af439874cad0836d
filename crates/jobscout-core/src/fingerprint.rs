//! Cross-source identity for job records.
//!
//! Two listings are the same job when title, company and location match
//! exactly. Description, apply URL and source are deliberately ignored so a
//! listing cross-posted on several sites collapses to one record.

use std::collections::HashSet;
use std::fmt;

use crate::models::{JobRecord, compute_hash};

/// Joins the identity fields. ASCII unit separator never occurs in scraped
/// display text.
const SEPARATOR: char = '\u{1f}';

/// SHA-256 identity of a job listing (64-char lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of an accepted record.
    pub fn of(record: &JobRecord) -> Self {
        Self::from_parts(&record.job_title, &record.company_name, &record.location)
    }

    pub fn from_parts(job_title: &str, company_name: &str, location: &str) -> Self {
        let key = format!("{job_title}{SEPARATOR}{company_name}{SEPARATOR}{location}");
        Fingerprint(compute_hash(&key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints observed during one run. Grows monotonically, never persisted.
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<Fingerprint>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the fingerprint. Returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
