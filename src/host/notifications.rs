//! Forwarding of server messages the client does not handle itself.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::protocol::PacketType;

/// A server message the client forwards without interpreting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Type tag of the frame.
    pub packet_type: PacketType,
    /// Raw payload.
    pub payload: Bytes,
}

/// Receives forwarded notifications on the delivery context.
///
/// Implementations must not block; hand work off to another task.
pub trait NotificationSink: Send + Sync {
    /// Called once per forwarded frame, in arrival order.
    fn on_notification(&self, notification: Notification);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardNotifications;

impl NotificationSink for DiscardNotifications {
    fn on_notification(&self, notification: Notification) {
        tracing::debug!("Discarding notification {:?}", notification.packet_type);
    }
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn on_notification(&self, notification: Notification) {
        if self.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for packet_type in [PacketType::EventCreated, PacketType::VotingStatus] {
            tx.on_notification(Notification {
                packet_type,
                payload: Bytes::from_static(b"p"),
            });
        }

        assert_eq!(rx.try_recv().unwrap().packet_type, PacketType::EventCreated);
        assert_eq!(rx.try_recv().unwrap().packet_type, PacketType::VotingStatus);
    }
}
