//! Business entities for group order collection. Pure data with no actor concerns.

pub mod deadline;
pub mod item;
pub mod order;
pub mod summary;

pub use deadline::*;
pub use item::*;
pub use order::*;
pub use summary::*;

/// Identifier of an external group chat.
pub type ChatId = i64;
/// Identifier of a chat member.
pub type UserId = i64;
/// Store-assigned order identifier.
pub type OrderId = i64;
/// Store-assigned item identifier.
pub type ItemId = i64;
