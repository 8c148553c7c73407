//! Event creation policies.
//!
//! An [`EventCreationPolicy`] decides when a scope calls its data provider:
//!
//! | Policy | Start | `save()` | Completion |
//! |---|---|---|---|
//! | `InsertOnStartReplaceOnEnd` | insert | replace | replace |
//! | `InsertOnStartInsertOnEnd` | insert | ignored | insert |
//! | `InsertOnEnd` | - | ignored | insert |
//! | `Manual` | - | insert, then replace | - |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a scope does with its provider on an explicit `save()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// Ignore the call.
    Ignore,
    /// Replace the event stored under the captured id.
    Replace,
    /// Insert when nothing was persisted yet, replace afterwards.
    InsertOrReplace,
}

/// What a scope does with its provider when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    /// Nothing is persisted.
    Nothing,
    /// Insert a new event.
    Insert,
    /// Replace the event stored under the captured id.
    Replace,
}

/// Strategy controlling when audit events are flushed to the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCreationPolicy {
    /// Insert at start, replace on every save and at completion.
    InsertOnStartReplaceOnEnd,
    /// Insert at start and insert a second, independent event at completion.
    InsertOnStartInsertOnEnd,
    /// Insert a single event at completion.
    #[default]
    InsertOnEnd,
    /// Only explicit saves persist.
    Manual,
}

impl EventCreationPolicy {
    /// All policies, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::InsertOnStartReplaceOnEnd,
        Self::InsertOnStartInsertOnEnd,
        Self::InsertOnEnd,
        Self::Manual,
    ];

    /// Returns true if the scope inserts when it is created.
    #[must_use]
    pub const fn inserts_on_start(self) -> bool {
        matches!(
            self,
            Self::InsertOnStartReplaceOnEnd | Self::InsertOnStartInsertOnEnd
        )
    }

    /// Returns the provider action taken on an explicit save.
    #[must_use]
    pub const fn save_action(self) -> SaveAction {
        match self {
            Self::InsertOnStartReplaceOnEnd => SaveAction::Replace,
            Self::InsertOnStartInsertOnEnd | Self::InsertOnEnd => SaveAction::Ignore,
            Self::Manual => SaveAction::InsertOrReplace,
        }
    }

    /// Returns the provider action taken at completion.
    #[must_use]
    pub const fn completion_action(self) -> CompletionAction {
        match self {
            Self::InsertOnStartReplaceOnEnd => CompletionAction::Replace,
            Self::InsertOnStartInsertOnEnd | Self::InsertOnEnd => CompletionAction::Insert,
            Self::Manual => CompletionAction::Nothing,
        }
    }

    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsertOnStartReplaceOnEnd => "insert_on_start_replace_on_end",
            Self::InsertOnStartInsertOnEnd => "insert_on_start_insert_on_end",
            Self::InsertOnEnd => "insert_on_end",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for EventCreationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event creation policy: {0}")]
pub struct ParsePolicyError(String);

impl FromStr for EventCreationPolicy {
    type Err = ParsePolicyError;

    /// Accepts the snake_case form as well as the hyphenated and
    /// PascalCase spellings (`insert-on-end`, `InsertOnEnd`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "insertonstartreplaceonend" => Ok(Self::InsertOnStartReplaceOnEnd),
            "insertonstartinsertonend" => Ok(Self::InsertOnStartInsertOnEnd),
            "insertonend" => Ok(Self::InsertOnEnd),
            "manual" => Ok(Self::Manual),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_insert_on_end() {
        assert_eq!(EventCreationPolicy::default(), EventCreationPolicy::InsertOnEnd);
    }

    #[test]
    fn test_inserts_on_start() {
        assert!(EventCreationPolicy::InsertOnStartReplaceOnEnd.inserts_on_start());
        assert!(EventCreationPolicy::InsertOnStartInsertOnEnd.inserts_on_start());
        assert!(!EventCreationPolicy::InsertOnEnd.inserts_on_start());
        assert!(!EventCreationPolicy::Manual.inserts_on_start());
    }

    #[test]
    fn test_policy_table() {
        use CompletionAction as C;
        use SaveAction as S;

        let table = [
            (EventCreationPolicy::InsertOnStartReplaceOnEnd, S::Replace, C::Replace),
            (EventCreationPolicy::InsertOnStartInsertOnEnd, S::Ignore, C::Insert),
            (EventCreationPolicy::InsertOnEnd, S::Ignore, C::Insert),
            (EventCreationPolicy::Manual, S::InsertOrReplace, C::Nothing),
        ];

        for (policy, save, completion) in table {
            assert_eq!(policy.save_action(), save, "{policy}");
            assert_eq!(policy.completion_action(), completion, "{policy}");
        }
    }

    #[test]
    fn test_parse_accepts_spellings() {
        assert_eq!(
            "InsertOnStartReplaceOnEnd".parse::<EventCreationPolicy>(),
            Ok(EventCreationPolicy::InsertOnStartReplaceOnEnd)
        );
        assert_eq!(
            "insert-on-end".parse::<EventCreationPolicy>(),
            Ok(EventCreationPolicy::InsertOnEnd)
        );
        assert_eq!(
            "manual".parse::<EventCreationPolicy>(),
            Ok(EventCreationPolicy::Manual)
        );
        assert!("sometimes".parse::<EventCreationPolicy>().is_err());
    }

    #[test]
    fn test_serialization_uses_snake_case() {
        let json = serde_json::to_string(&EventCreationPolicy::InsertOnStartInsertOnEnd).unwrap();
        assert_eq!(json, "\"insert_on_start_insert_on_end\"");
    }
}
