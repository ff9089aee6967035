//! API types shared between the server and client-side stores.
//!
//! This crate contains:
//! - Row types (e.g., `Board`, `Card`) - the API representation of database entities
//! - Request types (e.g., `CreateCardRequest`, `MoveCardRequest`) - API input types
//! - Shared enums (e.g., `WorkspaceRole`, `CardPriority`)
//! - Realtime frame types (`ClientFrame`, `ServerFrame`, `BoardEvent`)

use serde::{Deserialize, Deserializer};

pub mod board;
pub mod card;
pub mod list;
pub mod realtime;
pub mod user;
pub mod workspace;

pub use board::*;
pub use card::*;
pub use list::*;
pub use realtime::*;
pub use user::*;
pub use workspace::*;

pub fn some_if_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
