//! Inbound side: chat text and button callbacks to order operations.

mod dispatcher;
mod registry;

pub use dispatcher::{ChatUser, Dispatcher};
pub use registry::{Callback, Command, CommandRegistry};
