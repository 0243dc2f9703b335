//! Dead-key composition.
//!
//! A dead key arms the composer with one accent. The next resolvable key
//! press consumes it: either a listed combination or the bare accent
//! followed by the key's own character. Exactly one attempt is made per arm.

use crate::keycode;
use crate::mapping::DeadKeyDefinition;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when a dead key is pressed while another is already armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RearmPolicy {
    /// The newer accent replaces the armed one (last wins).
    #[default]
    Replace,
    /// The armed accent stays until it is consumed.
    KeepFirst,
}

/// Result of one composition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    /// The key had a combination; type this text.
    Combined(String),
    /// No combination. Type the bare accent, then `literal` if the key has
    /// a character of its own.
    Unmatched {
        base: String,
        literal: Option<char>,
    },
}

/// Holds at most one armed dead key.
#[derive(Debug, Default)]
pub struct DeadKeyComposer {
    armed: Option<DeadKeyDefinition>,
    policy: RearmPolicy,
}

impl DeadKeyComposer {
    pub fn new(policy: RearmPolicy) -> Self {
        Self {
            armed: None,
            policy,
        }
    }

    /// Arm a dead key. Returns `false` if the policy kept an already armed one.
    pub fn arm(&mut self, dead_key: DeadKeyDefinition) -> bool {
        if self.armed.is_some() && self.policy == RearmPolicy::KeepFirst {
            log::debug!("dead key {} ignored, {} already armed", dead_key.id, self.armed_id().unwrap_or(""));
            return false;
        }
        if let Some(previous) = self.armed.replace(dead_key) {
            log::debug!("dead key {} replaced", previous.id);
        }
        true
    }

    /// Drop the armed accent, if any.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Whether an accent waits for the next key.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Id of the armed dead key.
    pub fn armed_id(&self) -> Option<&str> {
        self.armed.as_ref().map(|dk| dk.id.as_str())
    }

    /// Combine the armed accent with the named key and disarm.
    ///
    /// With `shift` held a single-letter key first tries its upper-case
    /// name (`"E"`), then the plain one. Returns `None` if nothing was armed.
    pub fn compose(&mut self, key: &str, shift: bool) -> Option<Composition> {
        let dead_key = self.armed.take()?;

        let upper = shift
            .then(|| keycode::key_char(key, true))
            .flatten()
            .filter(char::is_ascii_uppercase)
            .map(String::from);

        let combined = upper
            .as_deref()
            .and_then(|name| dead_key.combination(name))
            .or_else(|| dead_key.combination(key));

        Some(match combined {
            Some(text) => Composition::Combined(text.to_string()),
            None => Composition::Unmatched {
                base: dead_key.base,
                literal: keycode::key_char(key, shift),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acute() -> DeadKeyDefinition {
        DeadKeyDefinition::new("acute", "´")
            .combine("e", "é")
            .combine("E", "É")
    }

    fn grave() -> DeadKeyDefinition {
        DeadKeyDefinition::new("grave", "`").combine("e", "è")
    }

    #[test]
    fn test_combination_hit_disarms() {
        let mut composer = DeadKeyComposer::default();
        assert!(composer.arm(acute()));
        assert!(composer.is_armed());

        assert_eq!(
            composer.compose("e", false),
            Some(Composition::Combined("é".into()))
        );
        assert!(!composer.is_armed());
        assert_eq!(composer.compose("e", false), None);
    }

    #[test]
    fn test_miss_yields_base_and_literal() {
        let mut composer = DeadKeyComposer::default();
        composer.arm(acute());
        assert_eq!(
            composer.compose("x", false),
            Some(Composition::Unmatched {
                base: "´".into(),
                literal: Some('x')
            })
        );
        assert!(!composer.is_armed());

        composer.arm(acute());
        assert_eq!(
            composer.compose("leftbrace", false),
            Some(Composition::Unmatched {
                base: "´".into(),
                literal: None
            })
        );
    }

    #[test]
    fn test_shift_prefers_uppercase_combination() {
        let mut composer = DeadKeyComposer::default();
        composer.arm(acute());
        assert_eq!(
            composer.compose("e", true),
            Some(Composition::Combined("É".into()))
        );

        // No uppercase entry: falls back to the plain name.
        composer.arm(grave());
        assert_eq!(
            composer.compose("e", true),
            Some(Composition::Combined("è".into()))
        );

        composer.arm(grave());
        assert_eq!(
            composer.compose("x", true),
            Some(Composition::Unmatched {
                base: "`".into(),
                literal: Some('X')
            })
        );
    }

    #[test]
    fn test_rearm_replace_is_last_wins() {
        let mut composer = DeadKeyComposer::new(RearmPolicy::Replace);
        composer.arm(acute());
        assert!(composer.arm(grave()));
        assert_eq!(composer.armed_id(), Some("grave"));
    }

    #[test]
    fn test_rearm_keep_first() {
        let mut composer = DeadKeyComposer::new(RearmPolicy::KeepFirst);
        composer.arm(acute());
        assert!(!composer.arm(grave()));
        assert_eq!(composer.armed_id(), Some("acute"));

        composer.disarm();
        assert!(composer.arm(grave()));
        assert_eq!(composer.armed_id(), Some("grave"));
    }
}
