use crate::error::{MuxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PLAN_SYSTEM_PROMPT: &str = "You are an expert software architect and planner.
Create a detailed, step-by-step implementation plan.
Include:
- Summary of the goal
- Key assumptions
- Architecture decisions
- Implementation steps
- Potential risks
";

/// What a review should concentrate on; selects the system prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFocus {
    #[default]
    General,
    Security,
    Performance,
    Architecture,
}

impl ReviewFocus {
    pub const ALL: [ReviewFocus; 4] = [
        ReviewFocus::General,
        ReviewFocus::Security,
        ReviewFocus::Performance,
        ReviewFocus::Architecture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewFocus::General => "general",
            ReviewFocus::Security => "security",
            ReviewFocus::Performance => "performance",
            ReviewFocus::Architecture => "architecture",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ReviewFocus::General => "You are an expert code reviewer. Provide thorough, actionable feedback.",
            ReviewFocus::Security => {
                "You are a security expert. Focus on security vulnerabilities, \
                 input validation, and potential exploits."
            }
            ReviewFocus::Performance => {
                "You are a performance expert. Focus on optimization opportunities, \
                 algorithmic efficiency, and resource usage."
            }
            ReviewFocus::Architecture => {
                "You are a software architect. Focus on design patterns, modularity, \
                 and long-term maintainability."
            }
        }
    }
}

impl fmt::Display for ReviewFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewFocus {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self> {
        ReviewFocus::ALL
            .into_iter()
            .find(|focus| focus.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                MuxError::InvalidInput(format!(
                    "unknown review focus '{}' (expected general, security, performance or architecture)",
                    s
                ))
            })
    }
}
