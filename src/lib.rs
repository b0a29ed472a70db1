// Core decision logic
pub mod policy;
pub mod status;

// Runtime state and persistence
pub mod state;
pub mod store;

// Event routing and command surface
pub mod commands;
pub mod dispatcher;
pub mod gateway;

// Platform and process plumbing
pub mod config;
pub mod discord;
pub mod keep_alive;

pub use commands::{Command, CommandHandler, CommandReply, Invoker};
pub use config::Config;
pub use dispatcher::EventDispatcher;
pub use gateway::{Author, Gateway, GatewayEvent};
pub use policy::{evaluate, RejectReason, Verdict};
pub use state::BotState;
pub use status::{StatusSample, StatusScheduler};
pub use store::ConfigStore;
