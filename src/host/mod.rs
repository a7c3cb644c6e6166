//! Host collaborators the client calls out to.
//!
//! - [`CredentialStore`] - persisted user id / auth token
//! - [`AlertSink`] - "login needed" and "server unreachable" alerts
//! - [`NotificationSink`] - server notifications the client does not consume

mod alerts;
mod credentials;
mod notifications;

pub use alerts::{ActiveAlerts, Alert, AlertSink, NoAlerts};
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use notifications::{DiscardNotifications, Notification, NotificationSink};
