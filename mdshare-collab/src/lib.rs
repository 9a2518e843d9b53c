//! # mdshare-collab — shared markdown document synchronization
//!
//! One plain-text buffer, rendered as markdown, kept identical across every
//! participant connected to a central relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     WebSocket      ┌──────────────┐
//! │  SyncClient  │ ◄────────────────► │ RelayServer  │
//! │  (per user)  │    JSON frames     │  (one room)  │
//! └──────┬───────┘                    └──────┬───────┘
//!        │                                   │
//!        ├── ConnectionManager               ├── latest content
//!        ├── SessionState + IdentityStore    ├── members
//!        ├── DocumentSyncChannel             └── broadcast fan-out
//!        ├── PresenceTracker
//!        └── ScrollSynchronizer (editor ⇄ preview)
//! ```
//!
//! The document is last-writer-wins: every change travels as the full
//! content and the last one the relay forwards is what everyone sees.
//!
//! ## Modules
//!
//! - [`protocol`] — Relay events and their JSON wire format
//! - [`connection`] — Transport with unlimited reconnection
//! - [`session`] — Display-name gate
//! - [`identity`] — Remembered display name
//! - [`document`] — Shared content, local echo, remote replace
//! - [`presence`] — Online participant count
//! - [`scroll`] — Feedback-safe scroll mirroring between panes
//! - [`client`] — The synchronization session tying it together
//! - [`relay`] — Reference relay server

pub mod protocol;
pub mod config;
pub mod connection;
pub mod session;
pub mod identity;
pub mod document;
pub mod presence;
pub mod scroll;
pub mod client;
pub mod relay;

// Re-exports for convenience
pub use protocol::{Direction, ProtocolError, RelayMessage};
pub use config::{ConfigError, ReconnectPolicy, RelayConfig, SyncConfig};
pub use connection::{Backoff, ConnectionEvent, ConnectionManager, ConnectionState};
pub use session::{SessionError, SessionState};
pub use identity::{
    FileIdentityStore, IdentityError, IdentityStore, MemoryIdentityStore, DISPLAY_NAME_KEY,
};
pub use document::{DocumentSyncChannel, MarkdownRenderer};
pub use presence::PresenceTracker;
pub use scroll::{
    MirrorOutcome, PaneMetrics, ScrollSnapshot, ScrollSurface, ScrollSyncState,
    ScrollSynchronizer,
};
pub use client::{ClientUpdate, FocusTarget, SyncClient, View};
pub use relay::{RelayError, RelayServer, RelayStats};
