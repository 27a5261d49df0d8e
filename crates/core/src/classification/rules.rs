//! Prioritized keyword rules for error classification
//!
//! Rules are evaluated top to bottom against the lower-cased error message
//! and the first match wins, so a message mentioning several groups resolves
//! to the earliest group: storage, then dependency, then resource, then the
//! domain leftovers.

use jobwarden_domain::TaskErrorCode;
use serde::Serialize;

/// Keyword group a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGroup {
    Storage,
    Dependency,
    Resource,
    Domain,
}

/// One classification rule
///
/// A rule matches when, for every keyword set in `requires`, the message
/// contains at least one keyword of that set as a whole word or phrase.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub group: RuleGroup,
    pub requires: &'static [&'static [&'static str]],
    pub code: TaskErrorCode,
}

impl ClassificationRule {
    /// Whether the rule applies to an already lower-cased message
    pub fn matches(&self, message: &str) -> bool {
        self.requires.iter().all(|any_of| any_of.iter().any(|keyword| contains_word(message, keyword)))
    }
}

/// Whether `keyword` occurs in `message` with no alphanumeric character on
/// either side, so "oom" does not hit "room" and "429" does not hit "1429"
fn contains_word(message: &str, keyword: &str) -> bool {
    let is_boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    message.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        is_boundary(message[..start].chars().next_back()) && is_boundary(message[end..].chars().next())
    })
}

const STORAGE: &[&str] = &[
    "storage", "database", "query", "queries", "sql", "postgres", "postgresql", "sqlite", "mysql",
    "redis", "table", "transaction",
];
const CONNECTION: &[&str] = &[
    "connection", "connections", "connect", "connecting", "refused", "unreachable", "pool",
    "broken pipe",
];
const NOT_FOUND: &[&str] = &["not found", "does not exist", "no rows", "no such"];

const DEPENDENCY: &[&str] = &[
    "dependency", "upstream", "model", "llm", "inference", "ollama", "openai", "anthropic",
    "provider", "endpoint", "http", "api",
];
const TIMEOUT: &[&str] = &["timeout", "timeouts", "timed out", "deadline exceeded"];
const RATE_LIMITED: &[&str] = &[
    "rate limit", "rate limited", "rate-limit", "rate-limited", "ratelimit", "too many requests",
    "http 429", "status 429",
];
const UNAVAILABLE: &[&str] =
    &["unavailable", "http 503", "status 503", "http 502", "status 502", "bad gateway", "overloaded"];
const INVALID_RESPONSE: &[&str] =
    &["invalid response", "malformed", "unexpected response", "invalid json", "failed to parse"];

const EXHAUSTED: &[&str] =
    &["exhausted", "out of memory", "oom", "quota", "no space left", "too many open files"];

const VALIDATION: &[&str] = &["validation", "invalid", "must be", "required field"];
const PERMISSION: &[&str] = &["permission", "forbidden", "unauthorized", "access denied", "not allowed"];
const CONFIG_MISSING: &[&str] =
    &["missing config", "not configured", "configuration missing", "environment variable", "environment variables"];
const CONFIG: &[&str] = &["configuration", "config"];

/// The rule table, in priority order
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    // Storage
    ClassificationRule {
        name: "storage_not_found",
        group: RuleGroup::Storage,
        requires: &[STORAGE, NOT_FOUND],
        code: TaskErrorCode::EntityNotFound,
    },
    ClassificationRule {
        name: "storage_connection",
        group: RuleGroup::Storage,
        requires: &[STORAGE, CONNECTION],
        code: TaskErrorCode::StorageConnectionError,
    },
    ClassificationRule {
        name: "storage_query",
        group: RuleGroup::Storage,
        requires: &[STORAGE],
        code: TaskErrorCode::StorageQueryError,
    },
    // Dependency
    ClassificationRule {
        name: "dependency_timeout",
        group: RuleGroup::Dependency,
        requires: &[DEPENDENCY, TIMEOUT],
        code: TaskErrorCode::DependencyTimeout,
    },
    ClassificationRule {
        name: "dependency_rate_limited",
        group: RuleGroup::Dependency,
        requires: &[RATE_LIMITED],
        code: TaskErrorCode::DependencyRateLimited,
    },
    ClassificationRule {
        name: "dependency_unavailable",
        group: RuleGroup::Dependency,
        requires: &[UNAVAILABLE],
        code: TaskErrorCode::DependencyUnavailable,
    },
    ClassificationRule {
        name: "dependency_invalid_response",
        group: RuleGroup::Dependency,
        requires: &[INVALID_RESPONSE],
        code: TaskErrorCode::DependencyInvalidResponse,
    },
    ClassificationRule {
        name: "dependency_connection",
        group: RuleGroup::Dependency,
        requires: &[DEPENDENCY, CONNECTION],
        code: TaskErrorCode::DependencyUnavailable,
    },
    // Resource
    ClassificationRule {
        name: "resource_timeout",
        group: RuleGroup::Resource,
        requires: &[TIMEOUT],
        code: TaskErrorCode::ResourceTimeout,
    },
    ClassificationRule {
        name: "resource_exhausted",
        group: RuleGroup::Resource,
        requires: &[EXHAUSTED],
        code: TaskErrorCode::ResourceExhausted,
    },
    // Domain leftovers
    ClassificationRule {
        name: "entity_not_found",
        group: RuleGroup::Domain,
        requires: &[NOT_FOUND],
        code: TaskErrorCode::EntityNotFound,
    },
    ClassificationRule {
        name: "permission_denied",
        group: RuleGroup::Domain,
        requires: &[PERMISSION],
        code: TaskErrorCode::PermissionDenied,
    },
    ClassificationRule {
        name: "configuration_missing",
        group: RuleGroup::Domain,
        requires: &[CONFIG_MISSING],
        code: TaskErrorCode::ConfigurationMissing,
    },
    ClassificationRule {
        name: "configuration_invalid",
        group: RuleGroup::Domain,
        requires: &[CONFIG],
        code: TaskErrorCode::ConfigurationInvalid,
    },
    ClassificationRule {
        name: "validation",
        group: RuleGroup::Domain,
        requires: &[VALIDATION],
        code: TaskErrorCode::ValidationError,
    },
];

/// First rule matching `message`, which must already be lower-cased
pub fn first_match<'a>(rules: &'a [ClassificationRule], message: &str) -> Option<&'a ClassificationRule> {
    rules.iter().find(|rule| rule.matches(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_for(message: &str) -> Option<TaskErrorCode> {
        first_match(CLASSIFICATION_RULES, &message.to_lowercase()).map(|rule| rule.code)
    }

    /// Validates each rule against a representative message.
    ///
    /// Assertions:
    /// - Every group resolves to its expected code.
    #[test]
    fn test_representative_messages() {
        let cases = [
            ("connection refused to database", TaskErrorCode::StorageConnectionError),
            ("Row not found in table meetings", TaskErrorCode::EntityNotFound),
            ("syntax error in SQL statement", TaskErrorCode::StorageQueryError),
            ("model request timed out", TaskErrorCode::DependencyTimeout),
            ("HTTP 429 Too Many Requests", TaskErrorCode::DependencyRateLimited),
            ("service unavailable", TaskErrorCode::DependencyUnavailable),
            ("malformed completion payload", TaskErrorCode::DependencyInvalidResponse),
            ("could not connect to ollama", TaskErrorCode::DependencyUnavailable),
            ("operation timed out", TaskErrorCode::ResourceTimeout),
            ("worker out of memory", TaskErrorCode::ResourceExhausted),
            ("meeting 42 not found", TaskErrorCode::EntityNotFound),
            ("permission denied for user", TaskErrorCode::PermissionDenied),
            ("API key not configured", TaskErrorCode::ConfigurationMissing),
            ("bad config value for retries", TaskErrorCode::ConfigurationInvalid),
            ("title must be non-empty", TaskErrorCode::ValidationError),
            ("classroom 7 not found", TaskErrorCode::EntityNotFound),
            ("meeting 1429 not found", TaskErrorCode::EntityNotFound),
            ("zoom recording 12 does not exist", TaskErrorCode::EntityNotFound),
            ("upstream status 429 from provider", TaskErrorCode::DependencyRateLimited),
            ("HTTP 503 from upstream", TaskErrorCode::DependencyUnavailable),
            ("dependency rate limited", TaskErrorCode::DependencyRateLimited),
            ("OOM killed the worker", TaskErrorCode::ResourceExhausted),
        ];

        for (message, expected) in cases {
            assert_eq!(code_for(message), Some(expected), "message: {message}");
        }
    }

    /// Validates the documented priority for multi-group messages.
    ///
    /// Assertions:
    /// - Storage wins over dependency and resource keywords.
    /// - Dependency wins over resource keywords.
    #[test]
    fn test_priority_order() {
        assert_eq!(code_for("database connection timeout"), Some(TaskErrorCode::StorageConnectionError));
        assert_eq!(code_for("upstream timeout while quota exhausted"), Some(TaskErrorCode::DependencyTimeout));
        assert_eq!(code_for("lock wait exhausted after timeout"), Some(TaskErrorCode::ResourceTimeout));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(code_for("something odd happened"), None);
    }

    /// Validates that keywords only match whole words.
    ///
    /// Assertions:
    /// - Keywords embedded in longer words or ids are ignored.
    /// - Punctuation and underscores count as word boundaries.
    #[test]
    fn test_keywords_match_whole_words() {
        assert_eq!(code_for("meeting 42 is unstable"), None);
        assert_eq!(code_for("the room 429 is booked"), None);
        assert!(contains_word("connection_refused by peer", "refused"));
        assert!(contains_word("ollama/llama3 timed out", "ollama"));
        assert!(!contains_word("boom", "oom"));
    }

    /// Validates that rules are listed group by group.
    ///
    /// Assertions:
    /// - Groups never interleave in the table.
    #[test]
    fn test_groups_are_contiguous() {
        let order = [RuleGroup::Storage, RuleGroup::Dependency, RuleGroup::Resource, RuleGroup::Domain];
        let mut position = 0;
        for rule in CLASSIFICATION_RULES {
            while order[position] != rule.group {
                position += 1;
                assert!(position < order.len(), "rule {} is out of group order", rule.name);
            }
        }
    }
}
