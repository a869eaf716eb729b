//! Client side of the completion service
//!
//! - **request**: JSON body posted for one question
//! - **client**: transport seam and its HTTP implementation
//! - **config**: endpoint, timeouts and defaults, loadable from TOML
//! - **roles**: preset role instructions
//! - **pipeline**: worker thread that streams answers into the session

pub mod client;
pub mod config;
pub mod pipeline;
pub mod request;
pub mod roles;

pub use client::{ByteStream, ChatTransport, HttpTransport};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use pipeline::{ChatCommand, ChatEvent, ChatHandle, ChatPipeline};
pub use request::ChatRequest;
pub use roles::{find_preset, preset_at, RolePreset, DEFAULT_ROLE, ROLE_PRESETS};
