use std::fmt;
use std::str::FromStr;

/// Error codes for all rule-compiler diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Rewrite structure errors
/// - E2xxx: Module and production resolution errors
/// - E3xxx: Macro expansion errors
/// - E9xxx: Internal compiler errors
///
/// Warnings use W#### with the same phase digits (W4xxx: evaluation).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Rewrite Structure Errors (E1xxx)
    /// Rule without any rewrite
    E1001,
    /// Rewrite nested under another rewrite
    E1002,
    /// Rewrite inside a configuration declaration
    E1003,
    /// Rewrite inside a side condition
    E1004,
    /// Rewrite under a function symbol
    E1005,

    // Resolution Errors (E2xxx)
    /// Circular module imports
    E2001,
    /// Imported module not found
    E2002,
    /// Tag names no production
    E2003,

    // Macro Errors (E3xxx)
    /// Macro expansion does not terminate
    E3001,

    // Internal Errors (E9xxx)
    /// Internal compiler error
    E9001,
    /// Too many errors
    E9002,

    // Evaluation Warnings (W4xxx)
    /// Function-rule fixpoint stopped at its iteration cap
    W4001,
    /// Evaluation fuel exhausted
    W4002,
}

const ALL: [ErrorCode; 13] = [
    ErrorCode::E1001,
    ErrorCode::E1002,
    ErrorCode::E1003,
    ErrorCode::E1004,
    ErrorCode::E1005,
    ErrorCode::E2001,
    ErrorCode::E2002,
    ErrorCode::E2003,
    ErrorCode::E3001,
    ErrorCode::E9001,
    ErrorCode::E9002,
    ErrorCode::W4001,
    ErrorCode::W4002,
];

impl ErrorCode {
    /// Get the numeric code as a string (e.g., "E1001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::W4001 => "W4001",
            ErrorCode::W4002 => "W4002",
        }
    }

    /// One-line explanation for `--explain`-style listings.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "rules must have at least one rewrite",
            ErrorCode::E1002 => "rewrites are not allowed to be nested",
            ErrorCode::E1003 => "rewrites are not allowed in configurations",
            ErrorCode::E1004 => "rewrites are not allowed in side conditions",
            ErrorCode::E1005 => "rewrites are not allowed under functions",
            ErrorCode::E2001 => "modules import each other circularly",
            ErrorCode::E2002 => "imported module could not be found",
            ErrorCode::E2003 => "no production carries the referenced tag",
            ErrorCode::E3001 => "macro expansion does not terminate",
            ErrorCode::E9001 => "internal compiler error",
            ErrorCode::E9002 => "too many errors",
            ErrorCode::W4001 => "function rules did not reach a fixpoint",
            ErrorCode::W4002 => "evaluation stopped after exhausting its fuel",
        }
    }

    /// Rewrite-structure errors (E1xxx range).
    pub fn is_rewrite_error(&self) -> bool {
        self.as_str().starts_with("E1")
    }

    /// Check if this is a warning code (Wxxx range).
    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter().copied().find(|code| code.as_str() == s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::E1002.to_string(), "E1002");
        assert_eq!(ErrorCode::E2001.as_str(), "E2001");
    }

    #[test]
    fn test_round_trip_through_str() {
        for code in ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
        }
        assert_eq!("E0000".parse::<ErrorCode>(), Err(()));
    }

    #[test]
    fn test_ranges() {
        assert!(ErrorCode::E1005.is_rewrite_error());
        assert!(!ErrorCode::E2001.is_rewrite_error());
        assert!(ErrorCode::W4001.is_warning());
        assert!(!ErrorCode::E3001.is_warning());
    }
}
