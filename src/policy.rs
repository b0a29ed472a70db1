//! # Feature: Content Policy
//!
//! Pure decision function for inbound messages. Side effects (delete, warn,
//! expire warning) belong to the dispatcher.
//!
//! Rules are checked in order and the first match wins:
//! 1. privileged authors are always allowed
//! 2. invite links to other communities are rejected
//! 3. banned words are rejected, scanning the list in its stored order

/// Markers that identify an invite link, matched case-insensitively
pub const INVITE_MARKERS: [&str; 2] = ["discord.gg/", "discord.com/invite/"];

/// Why a message was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InviteLink,
    BannedWord,
}

impl RejectReason {
    /// Warning text sent to the channel, mentioning the author
    pub fn warning(&self, mention: &str) -> String {
        match self {
            RejectReason::InviteLink => {
                format!("🚫 {mention} **Invite links to other servers are not allowed here!**")
            }
            RejectReason::BannedWord => {
                format!("⚠️ {mention} **Please keep your language polite!**")
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InviteLink => "invite_link",
            RejectReason::BannedWord => "banned_word",
        }
    }
}

/// Outcome of evaluating one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Reject {
        reason: RejectReason,
        matched_term: Option<String>,
    },
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Evaluate a message against the content policy
pub fn evaluate<S: AsRef<str>>(text: &str, is_privileged: bool, banned_words: &[S]) -> Verdict {
    if is_privileged {
        return Verdict::Allow;
    }

    let content = text.to_lowercase();

    if INVITE_MARKERS.iter().any(|marker| content.contains(marker)) {
        return Verdict::Reject {
            reason: RejectReason::InviteLink,
            matched_term: None,
        };
    }

    for word in banned_words {
        let word = word.as_ref();
        if word.is_empty() {
            continue;
        }
        if content.contains(&word.to_lowercase()) {
            return Verdict::Reject {
                reason: RejectReason::BannedWord,
                matched_term: Some(word.to_string()),
            };
        }
    }

    Verdict::Allow
}
