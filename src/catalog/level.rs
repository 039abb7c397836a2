use serde::{Deserialize, Serialize};
use std::fmt;

/// How a column must be redacted before its values are shown to a user.
///
/// Levels are totally ordered: `Unspecified < None < Partial < Full`.
/// Combining contributions from several source columns always takes the
/// maximum, so a derived column is masked at least as strictly as any
/// column it reads.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MaskingLevel {
    /// Sentinel for "no level recorded"; never a final result.
    #[serde(rename = "MASKING_LEVEL_UNSPECIFIED")]
    Unspecified,
    /// No redaction required.
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// Partially redacted (e.g. keep a prefix or suffix).
    #[serde(rename = "PARTIAL")]
    Partial,
    /// Fully redacted.
    #[serde(rename = "FULL")]
    Full,
}

impl MaskingLevel {
    /// The strictest level; folds over contributing columns stop early once
    /// the running maximum reaches it.
    pub const MAX: MaskingLevel = MaskingLevel::Full;
}

impl fmt::Display for MaskingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskingLevel::Unspecified => write!(f, "MASKING_LEVEL_UNSPECIFIED"),
            MaskingLevel::None => write!(f, "NONE"),
            MaskingLevel::Partial => write!(f, "PARTIAL"),
            MaskingLevel::Full => write!(f, "FULL"),
        }
    }
}

impl std::str::FromStr for MaskingLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MASKING_LEVEL_UNSPECIFIED" | "UNSPECIFIED" => Ok(MaskingLevel::Unspecified),
            "NONE" => Ok(MaskingLevel::None),
            "PARTIAL" => Ok(MaskingLevel::Partial),
            "FULL" => Ok(MaskingLevel::Full),
            _ => Err(format!("Invalid masking level: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(MaskingLevel::Unspecified < MaskingLevel::None);
        assert!(MaskingLevel::None < MaskingLevel::Partial);
        assert!(MaskingLevel::Partial < MaskingLevel::Full);
        assert_eq!(MaskingLevel::MAX, MaskingLevel::Full);
    }

    #[test]
    fn default_level_is_none() {
        assert_eq!(MaskingLevel::default(), MaskingLevel::None);
    }

    #[test]
    fn max_fold_is_monotone() {
        let mut level = MaskingLevel::default();
        for next in [MaskingLevel::Partial, MaskingLevel::None, MaskingLevel::Full] {
            level = level.max(next);
        }
        assert_eq!(level, MaskingLevel::Full);
    }

    #[test]
    fn parse_and_display_round_trip() {
        for level in [
            MaskingLevel::Unspecified,
            MaskingLevel::None,
            MaskingLevel::Partial,
            MaskingLevel::Full,
        ] {
            assert_eq!(MaskingLevel::from_str(&level.to_string()), Ok(level));
        }
        assert_eq!(MaskingLevel::from_str("partial"), Ok(MaskingLevel::Partial));
        let err = MaskingLevel::from_str("redacted").expect_err("unknown level should fail");
        assert!(err.contains("Invalid masking level"));
    }

    #[test]
    fn serde_wire_names_match_the_store_contract() {
        assert_eq!(
            serde_json::to_string(&MaskingLevel::Full).expect("level should serialize"),
            "\"FULL\""
        );
        let level: MaskingLevel =
            serde_json::from_str("\"MASKING_LEVEL_UNSPECIFIED\"").expect("level should parse");
        assert_eq!(level, MaskingLevel::Unspecified);
    }
}
