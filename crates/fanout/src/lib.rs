//! Realtime notification fan-out.
//!
//! This crate provides:
//! - The event vocabulary shared with realtime clients
//! - The `Notifier` port with log, broadcast-channel and composite
//!   implementations
//! - `Dispatcher`, the best-effort wrapper used by application services
//!
//! Delivery failures are logged and never propagated to the operation that
//! produced the event.

pub mod dispatch;
pub mod error;
pub mod event;
pub mod notifier;

pub use dispatch::{DEFAULT_DELIVERY_TIMEOUT, Dispatcher};
pub use error::{NotifyError, Result};
pub use event::{Audience, EventKind, Notification};
pub use notifier::{BroadcastNotifier, CompositeNotifier, LogNotifier, Notifier};
