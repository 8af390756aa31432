//! Validated batch request and output file naming

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::ops::RangeInclusive;

use crate::constants::FORBIDDEN_FILENAME_CHARS;
use crate::error::{MacroError, MacroResult};

/// Question order of the generated wordbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WordbookType {
    Original,
    Random,
    EngKorRandom,
}

impl WordbookType {
    /// Label shown by the host and used in file names
    pub fn label(self) -> &'static str {
        match self {
            WordbookType::Original => "원래 순서",
            WordbookType::Random => "랜덤",
            WordbookType::EngKorRandom => "영한랜덤",
        }
    }

    pub fn needs_version(self) -> bool {
        self != WordbookType::Original
    }
}

impl fmt::Display for WordbookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw form values, as entered on the command line or in a job file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JobForm {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<WordbookType>,
    pub version: Option<String>,
    pub day_start: u32,
    pub day_end: u32,
}

/// A request that passed validation; read-only for the whole batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBatchJob {
    name: String,
    kind: WordbookType,
    version: Option<String>,
    day_start: u32,
    day_end: u32,
}

impl DayBatchJob {
    /// Pure validation; nothing here touches the desktop
    pub fn validate(form: &JobForm) -> MacroResult<Self> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(MacroError::InvalidJob("wordbook name is required".into()));
        }

        let kind = form.kind.unwrap_or(WordbookType::Original);
        let version = if kind.needs_version() {
            let version = form.version.as_deref().map(str::trim).unwrap_or_default();
            if version.is_empty() {
                return Err(MacroError::InvalidJob(format!("version is required for '{kind}'")));
            }
            if !version.chars().all(|c| c.is_ascii_digit()) {
                return Err(MacroError::InvalidJob(format!("version '{version}' must be a number")));
            }
            Some(version.to_string())
        } else {
            None
        };

        if form.day_start < 1 || form.day_end < form.day_start {
            return Err(MacroError::InvalidDayRange {
                start: form.day_start,
                end: form.day_end,
            });
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            version,
            day_start: form.day_start,
            day_end: form.day_end,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> WordbookType {
        self.kind
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn days(&self) -> RangeInclusive<u32> {
        self.day_start..=self.day_end
    }

    /// `"{name} {label}ver{version} Day {day}"`; label and version only for
    /// the shuffled types. Filesystem-unsafe characters become `_`.
    pub fn filename(&self, day: u32) -> String {
        let mut name = self.name.clone();
        if self.kind.needs_version() {
            name.push(' ');
            name.push_str(self.kind.label());
        }
        if let Some(version) = &self.version {
            name.push_str("ver");
            name.push_str(version);
        }
        sanitize_filename(&format!("{name} Day {day}"))
    }
}

pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| if FORBIDDEN_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(kind: WordbookType, version: Option<&str>, start: u32, end: u32) -> JobForm {
        JobForm {
            name: "  Voca Master ".to_string(),
            kind: Some(kind),
            version: version.map(str::to_string),
            day_start: start,
            day_end: end,
        }
    }

    #[test]
    fn test_valid_original_drops_version() {
        let job = DayBatchJob::validate(&form(WordbookType::Original, Some("3"), 1, 5)).unwrap();
        assert_eq!(job.name(), "Voca Master");
        assert_eq!(job.version(), None);
        assert_eq!(job.days(), 1..=5);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut f = form(WordbookType::Original, None, 1, 1);
        f.name = "   ".into();
        assert!(matches!(DayBatchJob::validate(&f), Err(MacroError::InvalidJob(_))));
    }

    #[test]
    fn test_version_required_for_random_types() {
        for kind in [WordbookType::Random, WordbookType::EngKorRandom] {
            assert!(matches!(
                DayBatchJob::validate(&form(kind, None, 1, 1)),
                Err(MacroError::InvalidJob(_))
            ));
            assert!(matches!(
                DayBatchJob::validate(&form(kind, Some("2a"), 1, 1)),
                Err(MacroError::InvalidJob(_))
            ));
            assert!(DayBatchJob::validate(&form(kind, Some(" 12 "), 1, 1)).is_ok());
        }
    }

    #[test]
    fn test_day_range_rules() {
        assert!(matches!(
            DayBatchJob::validate(&form(WordbookType::Original, None, 5, 3)),
            Err(MacroError::InvalidDayRange { start: 5, end: 3 })
        ));
        assert!(matches!(
            DayBatchJob::validate(&form(WordbookType::Original, None, 0, 3)),
            Err(MacroError::InvalidDayRange { .. })
        ));
        let single = DayBatchJob::validate(&form(WordbookType::Original, None, 3, 3)).unwrap();
        assert_eq!(single.days().count(), 1);
    }

    #[test]
    fn test_filename_per_type() {
        let original = DayBatchJob::validate(&form(WordbookType::Original, None, 1, 9)).unwrap();
        assert_eq!(original.filename(4), "Voca Master Day 4");

        let random = DayBatchJob::validate(&form(WordbookType::Random, Some("2"), 1, 9)).unwrap();
        assert_eq!(random.filename(4), "Voca Master 랜덤ver2 Day 4");

        let eng_kor = DayBatchJob::validate(&form(WordbookType::EngKorRandom, Some("10"), 1, 9)).unwrap();
        assert_eq!(eng_kor.filename(12), "Voca Master 영한랜덤ver10 Day 12");
    }

    #[test]
    fn test_filename_is_filesystem_safe_and_deterministic() {
        let mut f = form(WordbookType::Original, None, 1, 1);
        f.name = r#"a\b/c:d*e?f"g<h>i|j"#.into();
        let job = DayBatchJob::validate(&f).unwrap();

        let first = job.filename(1);
        assert_eq!(first, "a_b_c_d_e_f_g_h_i_j Day 1");
        assert_eq!(first, job.filename(1));
        assert!(!first.contains(FORBIDDEN_FILENAME_CHARS));
    }

    #[test]
    fn test_form_from_job_file() {
        let f: JobForm = serde_json::from_str(
            r#"{"name": "Book", "type": "eng-kor-random", "version": "1", "day_start": 2, "day_end": 4}"#,
        )
        .unwrap();
        assert_eq!(f.kind, Some(WordbookType::EngKorRandom));
        let job = DayBatchJob::validate(&f).unwrap();
        assert_eq!(job.days(), 2..=4);

        // missing range fields default to 0 and fail validation
        let partial: JobForm = serde_json::from_str(r#"{"name": "Book"}"#).unwrap();
        assert!(matches!(DayBatchJob::validate(&partial), Err(MacroError::InvalidDayRange { .. })));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_filename("x:y|z");
        assert_eq!(sanitize_filename(&once), once);
    }
}
