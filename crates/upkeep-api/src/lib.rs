// upkeep-api: Async Rust client for the upkeep maintenance backend (REST + realtime)
//
// The REST surface is plain JSON over HTTP with no envelope and no
// authentication. Endpoint methods live in per-resource files (devices,
// alerts, settings) as inherent impls on `ApiClient`. The realtime surface
// is a WebSocket channel of `{type, data}` messages handled by
// `realtime::ChannelManager`.

pub mod client;
pub mod error;
pub mod realtime;
pub mod transport;
pub mod types;

mod alerts;
mod devices;
mod settings;

pub use client::ApiClient;
pub use error::Error;
pub use realtime::{ChannelManager, ChannelSignal, ChannelState, ReconnectPolicy, Subscription};
pub use transport::{TlsMode, TransportConfig};
pub use types::{MessageKind, RealtimePayload};
