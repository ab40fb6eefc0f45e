// Ordered counter patterns for the trapper `info` string
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Pattern set compiled once on first use.
///
/// Order matters: the first pattern that matches wins.
pub struct ResponsePatternSet {
    patterns: &'static [(&'static str, &'static str)], // (name, pattern)
    compiled: OnceLock<Result<Vec<Regex>, (&'static str, regex::Error)>>,
}

impl ResponsePatternSet {
    pub const fn new(patterns: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            patterns,
            compiled: OnceLock::new(),
        }
    }

    fn compiled(&self) -> Result<&[Regex], (&'static str, regex::Error)> {
        let compiled = self.compiled.get_or_init(|| {
            self.patterns
                .iter()
                .map(|(name, pattern)| Regex::new(pattern).map_err(|e| (*name, e)))
                .collect()
        });

        match compiled {
            Ok(regexes) => Ok(regexes.as_slice()),
            Err((name, e)) => Err((*name, e.clone())),
        }
    }

    /// Captures of the first pattern matching `text`, with its name.
    pub fn first_match<'t>(
        &self,
        text: &'t str,
    ) -> Result<Option<(&'static str, Captures<'t>)>, (&'static str, regex::Error)> {
        let regexes = self.compiled()?;
        Ok(self
            .patterns
            .iter()
            .zip(regexes)
            .find_map(|((name, _), regex)| regex.captures(text).map(|caps| (*name, caps))))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn pattern_names(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|(name, _)| *name).collect()
    }
}

/// Known `info` phrasings, newest first. Each captures processed, failed,
/// total and seconds spent.
pub static RESPONSE_PATTERNS: ResponsePatternSet = ResponsePatternSet::new(&[
    // 2.2 and later: processed: 50; failed: 1000; total: 1050; seconds spent: 0.09957
    (
        "zabbix_2_2",
        r"processed: (\d+); failed: (\d+); total: (\d+); seconds spent: (\d+\.\d+)",
    ),
    // 1.8 and 2.0: Processed 0 Failed 1 Total 1 Seconds spent 0.000057
    (
        "zabbix_2_0",
        r"Processed (\d+) Failed (\d+) Total (\d+) Seconds spent (\d+\.\d+)",
    ),
    (
        "tolerant",
        r"(?i)processed:? (\d+);? failed:? (\d+);? total:? (\d+);? seconds spent:? (\d+\.\d+)",
    ),
]);
