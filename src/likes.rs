use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// LikeAction
///
/// The transition a toggle performed. Serialised as `"liked"` / `"unliked"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LikeAction {
    Liked,
    Unliked,
}

impl LikeAction {
    /// Client-facing confirmation text.
    pub fn message(self) -> &'static str {
        match self {
            LikeAction::Liked => "The photo was liked!",
            LikeAction::Unliked => "You unliked the photo!",
        }
    }
}

/// toggle
///
/// Flips the membership of `user_id` in a photo's like set. The next state is
/// decided only by current membership: a member is removed (`Unliked`), anyone
/// else is appended (`Liked`). Callers cannot ask for a specific end state.
///
/// Every occurrence is removed on unlike, so a set that somehow picked up a
/// duplicate comes out clean.
pub fn toggle(likes: &mut Vec<Uuid>, user_id: Uuid) -> LikeAction {
    if likes.contains(&user_id) {
        likes.retain(|id| *id != user_id);
        LikeAction::Unliked
    } else {
        likes.push(user_id);
        LikeAction::Liked
    }
}
