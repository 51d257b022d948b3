use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

const PREFIX: &str = "SUB";
const USER_TAG_LEN: usize = 8;

/// Merchant-side payment reference, `SUB_<user8>_<plan>_<unix_millis>`.
///
/// The plan id travels inside the reference so verification can resolve the
/// purchased plan without trusting anything the client sends afterwards.
/// `user8` is the first 8 hex digits of the buyer's id; it scopes the
/// reference to one user but does not identify them on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReference {
    user_tag: String,
    plan_id: Uuid,
    issued_at_millis: i64,
}

impl PaymentReference {
    pub fn issue(user_id: Uuid, plan_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_tag: user_tag(user_id),
            plan_id,
            issued_at_millis: now.timestamp_millis(),
        }
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn belongs_to(&self, user_id: Uuid) -> bool {
        self.user_tag == user_tag(user_id)
    }
}

fn user_tag(user_id: Uuid) -> String {
    let mut tag = user_id.simple().to_string();
    tag.truncate(USER_TAG_LEN);
    tag
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            PREFIX,
            self.user_tag,
            self.plan_id.simple(),
            self.issued_at_millis
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed payment reference")]
pub struct MalformedReference;

impl FromStr for PaymentReference {
    type Err = MalformedReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('_');
        let (Some(prefix), Some(user), Some(plan), Some(millis), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(MalformedReference);
        };

        if prefix != PREFIX
            || user.len() != USER_TAG_LEN
            || !user.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(MalformedReference);
        }

        // Only the 32-digit simple form is accepted so the string round-trips.
        if plan.len() != 32 {
            return Err(MalformedReference);
        }
        let plan_id = Uuid::try_parse(plan).map_err(|_| MalformedReference)?;

        let issued_at_millis: i64 = millis.parse().map_err(|_| MalformedReference)?;
        if issued_at_millis < 0 {
            return Err(MalformedReference);
        }

        Ok(Self {
            user_tag: user.to_string(),
            plan_id,
            issued_at_millis,
        })
    }
}
