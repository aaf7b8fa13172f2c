//! Signaling session state machine.
//!
//! Transitions return `Result` instead of panicking; terminal states
//! absorb every later event.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::CarvizError;

// ── SessionState ─────────────────────────────────────────────────

/// Lifecycle of one viewer session.
///
/// ```text
///  Idle ──► OfferSent ──► Established ──► Closed
///    │          │              │
///    └──────────┴──────────────┴────────► Errored
/// ```
///
/// `Closed` is reachable from every non-terminal state as well.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Stream open, no offer written yet.
    #[default]
    Idle,

    /// Offer written; waiting for the peer's answer.
    OfferSent { since: Instant },

    /// Answer applied to the media layer.
    Established {
        /// When the first answer was applied.
        since: Instant,
        /// Answers applied so far, including the first.
        answers: u32,
    },

    /// The stream ended in an orderly way.
    Closed,

    /// The stream failed or a fatal decode error occurred.
    Errored { reason: String },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::OfferSent { .. } => write!(f, "OfferSent"),
            Self::Established { .. } => write!(f, "Established"),
            Self::Closed => write!(f, "Closed"),
            Self::Errored { reason } => write!(f, "Errored ({reason})"),
        }
    }
}

/// What to do with an `SdpAnswer` that does not arrive in `OfferSent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerPolicy {
    /// Apply every answer; the latest one wins.
    #[default]
    LastWriteWins,
    /// Only the first answer to our offer is accepted.
    Strict,
}

/// How an accepted answer relates to the session so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The answer to our offer.
    Completed,
    /// A further answer replacing an applied one.
    Replaced,
    /// An answer that arrived before any offer was written.
    Unsolicited,
}

impl SessionState {
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established { .. })
    }

    /// `Closed` and `Errored` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored { .. })
    }

    /// How long the session has been established.
    pub fn established_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Established { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `OfferSent`.
    ///
    /// Valid from: `Idle`.
    pub fn offer_sent(&mut self) -> Result<(), CarvizError> {
        match self {
            Self::Idle => {
                *self = Self::OfferSent {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(CarvizError::ProtocolViolation(
                "cannot send offer: not in Idle state",
            )),
        }
    }

    /// Decide whether an answer may be applied under `policy`, without
    /// changing state.
    pub fn check_answer(&self, policy: AnswerPolicy) -> Result<AnswerOutcome, CarvizError> {
        match (self, policy) {
            (Self::OfferSent { .. }, _) => Ok(AnswerOutcome::Completed),
            (Self::Closed | Self::Errored { .. }, _) => Err(CarvizError::ProtocolViolation(
                "cannot accept answer: session has ended",
            )),
            (_, AnswerPolicy::Strict) => Err(CarvizError::ProtocolViolation(
                "cannot accept answer: not in OfferSent state",
            )),
            (Self::Established { .. }, AnswerPolicy::LastWriteWins) => Ok(AnswerOutcome::Replaced),
            (Self::Idle, AnswerPolicy::LastWriteWins) => Ok(AnswerOutcome::Unsolicited),
        }
    }

    /// Transition to `Established` after the answer was applied.
    ///
    /// Valid whenever [`check_answer`](Self::check_answer) accepts.
    pub fn answer_applied(&mut self, policy: AnswerPolicy) -> Result<AnswerOutcome, CarvizError> {
        let outcome = self.check_answer(policy)?;
        *self = match self {
            Self::Established { since, answers } => Self::Established {
                since: *since,
                answers: *answers + 1,
            },
            _ => Self::Established {
                since: Instant::now(),
                answers: 1,
            },
        };
        Ok(outcome)
    }

    /// Orderly end of stream. Returns `false` if already terminal.
    pub fn close(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self = Self::Closed;
        true
    }

    /// Abnormal end. Returns `false` if already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self = Self::Errored {
            reason: reason.into(),
        };
        true
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut state = SessionState::default();
        assert_eq!(state, SessionState::Idle);

        state.offer_sent().unwrap();
        assert!(matches!(state, SessionState::OfferSent { .. }));

        let outcome = state.answer_applied(AnswerPolicy::default()).unwrap();
        assert_eq!(outcome, AnswerOutcome::Completed);
        assert!(state.is_established());
        assert!(state.established_duration().is_some());

        assert!(state.close());
        assert_eq!(state, SessionState::Closed);
    }

    #[test]
    fn offer_only_from_idle() {
        let mut state = SessionState::default();
        state.offer_sent().unwrap();
        assert!(state.offer_sent().is_err());
    }

    #[test]
    fn duplicate_answer_last_write_wins() {
        let mut state = SessionState::default();
        state.offer_sent().unwrap();
        state.answer_applied(AnswerPolicy::LastWriteWins).unwrap();
        let outcome = state.answer_applied(AnswerPolicy::LastWriteWins).unwrap();
        assert_eq!(outcome, AnswerOutcome::Replaced);
        assert!(matches!(state, SessionState::Established { answers: 2, .. }));
    }

    #[test]
    fn unsolicited_answer_accepted_permissively() {
        let mut state = SessionState::default();
        let outcome = state.answer_applied(AnswerPolicy::LastWriteWins).unwrap();
        assert_eq!(outcome, AnswerOutcome::Unsolicited);
        assert!(state.is_established());
    }

    #[test]
    fn strict_policy_rejects_extra_answers() {
        let mut state = SessionState::default();
        assert!(state.check_answer(AnswerPolicy::Strict).is_err());
        state.offer_sent().unwrap();
        state.answer_applied(AnswerPolicy::Strict).unwrap();
        assert!(state.answer_applied(AnswerPolicy::Strict).is_err());
        assert!(matches!(state, SessionState::Established { answers: 1, .. }));
    }

    #[test]
    fn terminal_states_absorb() {
        let mut state = SessionState::default();
        assert!(state.fail("reset by peer"));
        assert!(!state.close());
        assert!(!state.fail("again"));
        assert_eq!(
            state,
            SessionState::Errored {
                reason: "reset by peer".into()
            }
        );
        assert!(state.check_answer(AnswerPolicy::LastWriteWins).is_err());
    }

    #[test]
    fn close_from_offer_sent() {
        let mut state = SessionState::default();
        state.offer_sent().unwrap();
        assert!(state.close());
        assert!(state.is_terminal());
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Closed.to_string(), "Closed");
        assert_eq!(
            SessionState::Errored {
                reason: "eof".into()
            }
            .to_string(),
            "Errored (eof)"
        );
    }

    #[test]
    fn policy_parses_from_config_text() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: AnswerPolicy,
        }
        let w: Wrapper = serde_json::from_str(r#"{"policy":"strict"}"#).unwrap();
        assert_eq!(w.policy, AnswerPolicy::Strict);
        let w: Wrapper = serde_json::from_str(r#"{"policy":"last-write-wins"}"#).unwrap();
        assert_eq!(w.policy, AnswerPolicy::LastWriteWins);
    }
}
