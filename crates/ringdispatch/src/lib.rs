//! The client contract over the ring: a dispatch table, module
//! fan-out, and the armed polling loop that drives them.

pub mod driver;
pub mod module;

pub use driver::Driver;
pub use module::{update_types, ApiClient, BotModule, ModuleRegistry, Update};
