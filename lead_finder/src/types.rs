use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Type};
use utoipa::ToSchema;

macro_rules! sqlite_text_enum {
    ($name:ident) => {
        impl Type<Sqlite> for $name {
            fn type_info() -> SqliteTypeInfo {
                <&str as Type<Sqlite>>::type_info()
            }
        }

        impl<'r> Decode<'r, Sqlite> for $name {
            fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Sqlite>>::decode(value)?;
                s.parse().map_err(Into::into)
            }
        }

        impl<'q> Encode<'q, Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, BoxDynError> {
                <String as Encode<Sqlite>>::encode(self.to_string(), buf)
            }
        }
    };
}

/// Kind of background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Discovery,
    EmailCrawl,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::EmailCrawl => write!(f, "email_crawl"),
        }
    }
}

impl FromStr for JobType {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Self::Discovery),
            "email_crawl" => Ok(Self::EmailCrawl),
            _ => Err(color_eyre::eyre::eyre!("Invalid job type: {}", s)),
        }
    }
}

sqlite_text_enum!(JobType);

/// Job lifecycle: queued -> running -> (completed | cancelled | failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for JobStatus {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            _ => Err(color_eyre::eyre::eyre!("Invalid job status: {}", s)),
        }
    }
}

sqlite_text_enum!(JobStatus);

/// Severity of a job log line. SUCCESS/WARNING/ERROR spacing also feeds the
/// progress estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LogLevel {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Self::Info),
            "SUCCESS" => Ok(Self::Success),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(color_eyre::eyre::eyre!("Invalid log level: {}", s)),
        }
    }
}

sqlite_text_enum!(LogLevel);

/// Enrichment state of a facility's website or email column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Pending,
    Found,
    NotFound,
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Found => "found",
            Self::NotFound => "not_found",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EnrichmentStatus {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "found" => Ok(Self::Found),
            "not_found" => Ok(Self::NotFound),
            _ => Err(color_eyre::eyre::eyre!("Invalid enrichment status: {}", s)),
        }
    }
}

sqlite_text_enum!(EnrichmentStatus);

/// Which discovery strategy produced a website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebsiteSource {
    DomainGuess,
    DdgSearch,
    AlternativeTld,
}

impl fmt::Display for WebsiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DomainGuess => "domain_guess",
            Self::DdgSearch => "ddg_search",
            Self::AlternativeTld => "alternative_tld",
        };
        write!(f, "{s}")
    }
}

impl FromStr for WebsiteSource {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain_guess" => Ok(Self::DomainGuess),
            "ddg_search" => Ok(Self::DdgSearch),
            "alternative_tld" => Ok(Self::AlternativeTld),
            _ => Err(color_eyre::eyre::eyre!("Invalid website source: {}", s)),
        }
    }
}

/// Why a discovery call came up empty. The most specific negative state
/// reached wins; `NoMatch` is the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    DomainNotRelevant,
    DomainNotHotel,
    DdgNotRelevant,
    DdgNoCandidates,
    DdgNoValid,
    AlternativeNotRelevant,
    AlternativeNotHotel,
    NoMatch,
}

impl ReasonCode {
    /// Human-readable message to display next to the code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::DomainNotRelevant => "Guessed domains resolved but none looked related",
            Self::DomainNotHotel => "A related domain was reachable but did not validate as a hotel",
            Self::DdgNotRelevant => "Search returned candidates but none looked related",
            Self::DdgNoCandidates => "Search returned no scored candidates",
            Self::DdgNoValid => "Search candidates did not validate as hotels",
            Self::AlternativeNotRelevant => "Alternative-TLD domains did not look related",
            Self::AlternativeNotHotel => "Alternative-TLD domain did not validate as a hotel",
            Self::NoMatch => "All strategies exhausted",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DomainNotRelevant => "domain_not_relevant",
            Self::DomainNotHotel => "domain_not_hotel",
            Self::DdgNotRelevant => "ddg_not_relevant",
            Self::DdgNoCandidates => "ddg_no_candidates",
            Self::DdgNoValid => "ddg_no_valid",
            Self::AlternativeNotRelevant => "alternative_not_relevant",
            Self::AlternativeNotHotel => "alternative_not_hotel",
            Self::NoMatch => "no_match",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReasonCode {
    type Err = color_eyre::eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain_not_relevant" => Ok(Self::DomainNotRelevant),
            "domain_not_hotel" => Ok(Self::DomainNotHotel),
            "ddg_not_relevant" => Ok(Self::DdgNotRelevant),
            "ddg_no_candidates" => Ok(Self::DdgNoCandidates),
            "ddg_no_valid" => Ok(Self::DdgNoValid),
            "alternative_not_relevant" => Ok(Self::AlternativeNotRelevant),
            "alternative_not_hotel" => Ok(Self::AlternativeNotHotel),
            "no_match" => Ok(Self::NoMatch),
            _ => Err(color_eyre::eyre::eyre!("Invalid reason code: {}", s)),
        }
    }
}

/// A validated website match produced by the discovery engine.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FoundWebsite {
    pub url: String,
    /// Composite confidence in [0, 100].
    pub score: f64,
    pub source: WebsiteSource,
    pub indicators: Vec<String>,
}

/// Result of one `find_website` call: a scored match or a typed miss.
#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    Found(FoundWebsite),
    NotFound { reason: ReasonCode },
}

/// Verdict of the content validator for one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_hotel: bool,
    /// Confidence in [0, 100].
    pub confidence: f64,
    pub indicators: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn reason_code_round_trip() {
        for reason in [
            ReasonCode::DomainNotRelevant,
            ReasonCode::DomainNotHotel,
            ReasonCode::DdgNotRelevant,
            ReasonCode::DdgNoCandidates,
            ReasonCode::DdgNoValid,
            ReasonCode::AlternativeNotRelevant,
            ReasonCode::AlternativeNotHotel,
            ReasonCode::NoMatch,
        ] {
            let parsed: ReasonCode = reason.to_string().parse().unwrap();
            assert_eq!(parsed, reason);
        }
    }

    #[test]
    fn log_level_uses_upper_case() {
        assert_eq!(LogLevel::Success.to_string(), "SUCCESS");
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("warning".parse::<LogLevel>().is_err());
    }

    #[test]
    fn website_source_round_trip() {
        for source in [
            WebsiteSource::DomainGuess,
            WebsiteSource::DdgSearch,
            WebsiteSource::AlternativeTld,
        ] {
            let parsed: WebsiteSource = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
    }
}
