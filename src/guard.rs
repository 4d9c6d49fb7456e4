use uuid::Uuid;

use crate::models::{Identity, Photo};

/// Owned
///
/// A resource with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Photo {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Action
///
/// What the caller wants to do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    Like,
    Comment,
}

impl Action {
    /// Whether the action mutates the resource itself and therefore needs ownership.
    pub fn requires_ownership(self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

/// Denial
///
/// Why the guard refused an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("caller does not own the resource")]
    NotOwner,
}

/// authorize
///
/// Decides whether `identity` may perform `action` on `resource`.
///
/// - `Update` / `Delete`: the identity must be present and its id must equal the
///   resource's owner id. Anything else is `NotOwner`.
/// - `Read` / `Like` / `Comment`: any present identity is enough, otherwise
///   `Unauthenticated`.
///
/// Ownership is compared by id value. The resource and the identity are loaded
/// by separate queries, so nothing else ties them together.
pub fn authorize<R>(resource: &R, identity: Option<&Identity>, action: Action) -> Result<(), Denial>
where
    R: Owned + ?Sized,
{
    if action.requires_ownership() {
        return match identity {
            Some(identity) if identity.id == resource.owner_id() => Ok(()),
            _ => Err(Denial::NotOwner),
        };
    }

    authenticated(identity).map(|_| ())
}

/// authenticated
///
/// The resource-free half of the guard, used where no single resource is
/// loaded yet (create, listings, atomic like/comment updates).
pub fn authenticated(identity: Option<&Identity>) -> Result<&Identity, Denial> {
    identity.ok_or(Denial::Unauthenticated)
}
