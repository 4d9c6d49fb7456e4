/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied
/// once, at the module boundary, rather than per handler.

/// Routes open to any client.
pub mod public;

/// Routes behind the token verifier. Every handler here receives an `AuthUser`.
pub mod authenticated;
