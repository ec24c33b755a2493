//! Moderation engine — the state machine gating public visibility.
//!
//! | From | Action | To |
//! |------|--------|----|
//! | unmoderated | `approve` | approved, stamped with time and actor |
//! | approved | `approve` | unchanged |
//! | any | `reject` | unmoderated, stamp cleared |
//! | any | `delete` | record removed |
//!
//! There is no separate rejected state: a rejected response is pending again.
//! The engine trusts the caller's [`Authorization`]; checking credentials is
//! the job of whoever builds it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  response::Moderation,
  store::{ResponseStore, ResponseUpdate},
};

// ─── Authorization ───────────────────────────────────────────────────────────

/// The authorization decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
  pub is_admin: bool,
  /// Identity stamped onto approvals.
  pub actor:    String,
}

impl Authorization {
  pub fn admin(actor: impl Into<String>) -> Self {
    Self { is_admin: true, actor: actor.into() }
  }

  pub fn anonymous() -> Self {
    Self { is_admin: false, actor: "anonymous".into() }
  }

  /// The actor, if this request may perform administrative operations.
  pub fn require_admin(&self) -> Result<&str> {
    if self.is_admin {
      Ok(&self.actor)
    } else {
      Err(Error::Unauthorized)
    }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModerationAction {
  Approve,
  Reject,
  Delete,
}

/// The store effect of applying an action to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  Set(Moderation),
  Unchanged,
  Remove,
}

/// Compute the effect of `action` on a response currently in `current`.
pub fn transition(
  current: &Moderation,
  action: ModerationAction,
  actor: &str,
  now: DateTime<Utc>,
) -> Transition {
  match (action, current) {
    (ModerationAction::Approve, Moderation::Approved { .. }) => {
      Transition::Unchanged
    }
    (ModerationAction::Approve, Moderation::Unmoderated) => {
      Transition::Set(Moderation::Approved {
        moderated_at: now,
        moderated_by: actor.to_owned(),
      })
    }
    (ModerationAction::Reject, Moderation::Unmoderated) => Transition::Unchanged,
    (ModerationAction::Reject, Moderation::Approved { .. }) => {
      Transition::Set(Moderation::Unmoderated)
    }
    (ModerationAction::Delete, _) => Transition::Remove,
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Result of a moderation call, shaped for a JSON action reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationOutcome {
  pub ok:      bool,
  pub id:      i64,
  pub action:  ModerationAction,
  pub message: String,
}

/// Apply the named action to response `id` on behalf of `actor`.
///
/// Unknown action names fail with [`Error::InvalidAction`] before the store
/// is touched. Approve and reject also fail that way when the store's shape
/// has no moderation fields.
pub async fn moderate<S>(
  store: &S,
  id: i64,
  action: &str,
  actor: &str,
) -> Result<ModerationOutcome>
where
  S: ResponseStore,
{
  let action: ModerationAction = action
    .trim()
    .parse()
    .map_err(|_| Error::InvalidAction(action.to_owned()))?;

  if action != ModerationAction::Delete && !store.shape().has_moderation() {
    return Err(Error::InvalidAction(format!(
      "{action}: moderation is not enabled for this survey"
    )));
  }

  let current = store.get(id).await.map_err(Into::<Error>::into)?;

  let message = match transition(&current.moderation, action, actor, Utc::now())
  {
    Transition::Set(moderation) => {
      store
        .update(id, ResponseUpdate::Moderation(moderation))
        .await
        .map_err(Into::<Error>::into)?;
      match action {
        ModerationAction::Approve => format!("response {id} approved"),
        _ => format!("response {id} returned to moderation"),
      }
    }
    Transition::Unchanged => match action {
      ModerationAction::Approve => format!("response {id} is already approved"),
      _ => format!("response {id} is already awaiting moderation"),
    },
    Transition::Remove => {
      store.delete(id).await.map_err(Into::<Error>::into)?;
      format!("response {id} deleted")
    }
  };

  Ok(ModerationOutcome { ok: true, id, action, message })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approved() -> Moderation {
    Moderation::Approved {
      moderated_at: DateTime::UNIX_EPOCH,
      moderated_by: "first".into(),
    }
  }

  #[test]
  fn approve_stamps_time_and_actor() {
    let now = Utc::now();
    let t = transition(&Moderation::Unmoderated, ModerationAction::Approve, "ops", now);
    assert_eq!(t, Transition::Set(Moderation::Approved {
      moderated_at: now,
      moderated_by: "ops".into(),
    }));
  }

  #[test]
  fn reapprove_keeps_original_stamp() {
    let t = transition(&approved(), ModerationAction::Approve, "second", Utc::now());
    assert_eq!(t, Transition::Unchanged);
  }

  #[test]
  fn reject_clears_approval() {
    let t = transition(&approved(), ModerationAction::Reject, "ops", Utc::now());
    assert_eq!(t, Transition::Set(Moderation::Unmoderated));

    let t = transition(&Moderation::Unmoderated, ModerationAction::Reject, "ops", Utc::now());
    assert_eq!(t, Transition::Unchanged);
  }

  #[test]
  fn delete_removes_from_any_state() {
    for state in [Moderation::Unmoderated, approved()] {
      let t = transition(&state, ModerationAction::Delete, "ops", Utc::now());
      assert_eq!(t, Transition::Remove);
    }
  }

  #[test]
  fn action_names() {
    assert_eq!("approve".parse::<ModerationAction>().unwrap(), ModerationAction::Approve);
    assert!("publish".parse::<ModerationAction>().is_err());
    assert!("Approve".parse::<ModerationAction>().is_err());
  }

  #[test]
  fn anonymous_is_not_admin() {
    assert!(matches!(Authorization::anonymous().require_admin(), Err(Error::Unauthorized)));
    assert_eq!(Authorization::admin("root").require_admin().unwrap(), "root");
  }
}
