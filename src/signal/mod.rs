mod command;
mod store;

pub use command::Command;
pub use store::SignalStore;
