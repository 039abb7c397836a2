use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

/// Severity of an advice entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdviceStatus {
    /// Nothing to report.
    Success,
    /// The rule is configured as a warning.
    Warn,
    /// The rule is configured as an error.
    Error,
}

/// Stable numeric code identifying what an advice entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdviceCode {
    /// No findings.
    Ok = 0,
    /// An auto-increment column name violates the configured convention.
    NamingAutoIncrementColumnConventionMismatch = 310,
}

/// One finding produced by an advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    /// Severity, taken from the rule level.
    pub status: AdviceStatus,
    /// What kind of finding this is.
    pub code: AdviceCode,
    /// Rule title, normally the rule type.
    pub title: String,
    /// Human-readable description of the finding.
    pub content: String,
    /// Line in the DDL the finding points at (1-based).
    pub line: u64,
}

/// Configured severity of a review rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLevel {
    /// Violations are reported as warnings.
    Warning,
    /// Violations are reported as errors.
    Error,
}

impl RuleLevel {
    /// The advice status findings of this rule carry.
    pub fn advice_status(self) -> AdviceStatus {
        match self {
            RuleLevel::Warning => AdviceStatus::Warn,
            RuleLevel::Error => AdviceStatus::Error,
        }
    }
}

/// A review rule handed to an advisor: its type, severity, and a
/// rule-specific JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule type identifier, used as the advice title.
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Configured severity.
    pub level: RuleLevel,
    /// Rule-specific JSON payload.
    pub payload: String,
}

/// Payload of naming rules: a format regex and an optional maximum length.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingRulePayload {
    /// Regex a conforming name must match.
    pub format: String,
    /// Maximum name length; `0` disables the length check.
    #[serde(default)]
    pub max_length: usize,
}

impl NamingRulePayload {
    /// Parse a naming payload from a rule's JSON and compile its regex.
    pub fn from_rule(rule: &Rule) -> Result<(Regex, usize), AdvisorError> {
        let payload: NamingRulePayload = serde_json::from_str(&rule.payload)?;
        let format = Regex::new(&payload.format)?;
        Ok((format, payload.max_length))
    }
}

/// What advisors receive: the parsed DDL plus the rule under review.
#[derive(Debug, Clone)]
pub struct AdvisorContext {
    /// Parsed statements of the DDL under review.
    pub statements: Vec<Statement>,
    /// The rule being checked.
    pub rule: Rule,
}

/// Failures while running an advisor (the findings themselves are advice,
/// not errors).
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The rule payload is not valid JSON for this rule type.
    #[error("failed to parse rule payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The naming format is not a valid regex.
    #[error("invalid naming format: {0}")]
    Format(#[from] regex::Error),
}

/// A rule-based advisor: walks an already-parsed DDL AST and emits advice.
pub trait Advisor {
    /// Run the check. An empty DDL or a clean one yields a single
    /// [`AdviceStatus::Success`] entry.
    fn check(&self, ctx: &AdvisorContext) -> Result<Vec<Advice>, AdvisorError>;
}

/// Parse MySQL DDL for advisor input.
pub fn parse_mysql_ddl(sql: &str) -> Result<Vec<Statement>, sqlparser::parser::ParserError> {
    Parser::parse_sql(&MySqlDialect {}, sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_payload_parses_format_and_max_length() {
        let rule = Rule {
            rule_type: "naming.column.auto-increment".to_string(),
            level: RuleLevel::Warning,
            payload: r#"{"format": "^id$", "maxLength": 16}"#.to_string(),
        };
        let (format, max_length) = NamingRulePayload::from_rule(&rule).expect("payload should parse");
        assert!(format.is_match("id"));
        assert!(!format.is_match("seq"));
        assert_eq!(max_length, 16);
    }

    #[test]
    fn naming_payload_max_length_defaults_to_zero() {
        let rule = Rule {
            rule_type: "naming.column.auto-increment".to_string(),
            level: RuleLevel::Error,
            payload: r#"{"format": "^id$"}"#.to_string(),
        };
        let (_, max_length) = NamingRulePayload::from_rule(&rule).expect("payload should parse");
        assert_eq!(max_length, 0);
    }

    #[test]
    fn malformed_payload_and_regex_are_reported() {
        let rule = Rule {
            rule_type: "naming.column.auto-increment".to_string(),
            level: RuleLevel::Error,
            payload: "not json".to_string(),
        };
        assert!(matches!(
            NamingRulePayload::from_rule(&rule),
            Err(AdvisorError::Payload(_))
        ));

        let rule = Rule {
            rule_type: "naming.column.auto-increment".to_string(),
            level: RuleLevel::Error,
            payload: r#"{"format": "("}"#.to_string(),
        };
        assert!(matches!(
            NamingRulePayload::from_rule(&rule),
            Err(AdvisorError::Format(_))
        ));
    }

    #[test]
    fn rule_level_maps_to_advice_status() {
        assert_eq!(RuleLevel::Warning.advice_status(), AdviceStatus::Warn);
        assert_eq!(RuleLevel::Error.advice_status(), AdviceStatus::Error);
    }
}
