//! Pure Rust async client for the Quake 3 / Jedi Academy connectionless
//! query protocol: `getinfo`, `getstatus` and master server `getservers`.
#![allow(async_fn_in_trait)]

pub mod destination;
pub mod error;
pub mod event;
pub mod info;
pub mod master;
pub mod packet;
mod parse;
pub mod query;
pub mod transport;

pub use destination::{Destination, Targets};
pub use error::QueryError;
pub use event::{Event, EventKind, SubscriptionId};
pub use info::{GameType, InfoRecord, Player, StatusRecord};
pub use master::ServerEntry;
pub use query::{Client, ClientConfig};
