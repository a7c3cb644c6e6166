//! Single-listener slots, one per request family.
//!
//! A family has at most one request in flight. Each slot is resolved
//! exactly once: by the matching response, by a timeout, or by connection
//! teardown. `Listener::resolve` consumes the listener, so a slot cannot
//! answer twice.

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{RequestError, RequestResult};
use crate::protocol::PacketType;

/// Request families that expect one correlated terminal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    CreateAccount,
    NewAuthToken,
    Authenticate,
}

impl Family {
    /// All families, in teardown order.
    pub const ALL: [Family; 3] = [
        Family::CreateAccount,
        Family::NewAuthToken,
        Family::Authenticate,
    ];

    /// Type tag of the request that opens this family's slot.
    pub fn request_type(self) -> PacketType {
        match self {
            Family::CreateAccount => PacketType::UserCreateAccount,
            Family::NewAuthToken => PacketType::UserNewAuthToken,
            Family::Authenticate => PacketType::UserAuth,
        }
    }

    /// Family whose request carries `packet_type`.
    pub fn from_request_type(packet_type: PacketType) -> Option<Self> {
        match packet_type {
            PacketType::UserCreateAccount => Some(Family::CreateAccount),
            PacketType::UserNewAuthToken => Some(Family::NewAuthToken),
            PacketType::UserAuth => Some(Family::Authenticate),
            _ => None,
        }
    }
}

/// Caller side of a correlated request.
///
/// Dropping it is fine; the eventual result is then discarded.
#[derive(Debug)]
pub struct PendingRequest {
    rx: oneshot::Receiver<RequestResult>,
}

impl PendingRequest {
    pub(crate) fn channel() -> (Listener, PendingRequest) {
        let (tx, rx) = oneshot::channel();
        (Listener { tx }, PendingRequest { rx })
    }

    /// Wait for the terminal result.
    ///
    /// Returns `None` when the request will never be answered: it was
    /// ignored because another request of the same family was in flight, or
    /// the client was dropped.
    pub async fn wait(self) -> Option<RequestResult> {
        self.rx.await.ok()
    }

    /// Non-blocking check. `None` while unresolved or if never answered.
    pub fn try_result(&mut self) -> Option<RequestResult> {
        self.rx.try_recv().ok()
    }
}

/// Delivery-context side of a correlated request.
#[derive(Debug)]
pub(crate) struct Listener {
    tx: oneshot::Sender<RequestResult>,
}

impl Listener {
    pub(crate) fn resolve(self, result: RequestResult) {
        // Caller may have dropped its PendingRequest.
        let _ = self.tx.send(result);
    }
}

#[derive(Debug)]
struct Slot {
    listener: Listener,
    deadline: Option<Instant>,
}

/// The three family slots.
#[derive(Debug, Default)]
pub(crate) struct PendingSlots {
    create_account: Option<Slot>,
    new_auth_token: Option<Slot>,
    authenticate: Option<Slot>,
}

impl PendingSlots {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self, family: Family) -> &Option<Slot> {
        match family {
            Family::CreateAccount => &self.create_account,
            Family::NewAuthToken => &self.new_auth_token,
            Family::Authenticate => &self.authenticate,
        }
    }

    fn slot_mut(&mut self, family: Family) -> &mut Option<Slot> {
        match family {
            Family::CreateAccount => &mut self.create_account,
            Family::NewAuthToken => &mut self.new_auth_token,
            Family::Authenticate => &mut self.authenticate,
        }
    }

    pub(crate) fn is_occupied(&self, family: Family) -> bool {
        self.slot(family).is_some()
    }

    /// Park `listener` in the family's slot.
    ///
    /// Hands the listener back if the slot is already taken.
    pub(crate) fn occupy(
        &mut self,
        family: Family,
        listener: Listener,
        deadline: Option<Instant>,
    ) -> Result<(), Listener> {
        let slot = self.slot_mut(family);
        if slot.is_some() {
            return Err(listener);
        }
        *slot = Some(Slot { listener, deadline });
        Ok(())
    }

    /// Resolve and clear the family's slot. Returns whether it was occupied.
    pub(crate) fn resolve(&mut self, family: Family, result: RequestResult) -> bool {
        match self.slot_mut(family).take() {
            Some(slot) => {
                slot.listener.resolve(result);
                true
            }
            None => false,
        }
    }

    /// Resolve every occupied slot with `error`. Returns how many were resolved.
    pub(crate) fn drain(&mut self, error: RequestError) -> usize {
        Family::ALL
            .into_iter()
            .filter(|family| self.resolve(*family, Err(error.clone())))
            .count()
    }

    /// Earliest deadline among occupied slots.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        Family::ALL
            .into_iter()
            .filter_map(|family| self.slot(family).as_ref().and_then(|slot| slot.deadline))
            .min()
    }

    /// Resolve slots whose deadline has passed with `Timeout`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Family> {
        let expired: Vec<Family> = Family::ALL
            .into_iter()
            .filter(|family| {
                self.slot(*family)
                    .as_ref()
                    .and_then(|slot| slot.deadline)
                    .is_some_and(|deadline| deadline <= now)
            })
            .collect();

        for family in &expired {
            self.resolve(*family, Err(RequestError::Timeout));
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_family_request_types() {
        for family in Family::ALL {
            assert_eq!(Family::from_request_type(family.request_type()), Some(family));
        }
        assert_eq!(Family::from_request_type(PacketType::Ping), None);
    }

    #[tokio::test]
    async fn test_occupied_slot_rejects_second_listener() {
        let mut slots = PendingSlots::new();
        let (first, first_rx) = PendingRequest::channel();
        let (second, second_rx) = PendingRequest::channel();

        assert!(slots.occupy(Family::Authenticate, first, None).is_ok());
        let rejected = slots.occupy(Family::Authenticate, second, None);
        assert!(rejected.is_err());
        drop(rejected);

        assert!(slots.resolve(Family::Authenticate, Ok(())));
        assert!(!slots.resolve(Family::Authenticate, Ok(())));

        assert_eq!(first_rx.wait().await, Some(Ok(())));
        assert_eq!(second_rx.wait().await, None);
    }

    #[tokio::test]
    async fn test_drain_resolves_each_once() {
        let mut slots = PendingSlots::new();
        let (create, create_rx) = PendingRequest::channel();
        let (auth, auth_rx) = PendingRequest::channel();
        slots.occupy(Family::CreateAccount, create, None).unwrap();
        slots.occupy(Family::Authenticate, auth, None).unwrap();

        assert_eq!(slots.drain(RequestError::ConnectionClosed), 2);
        assert_eq!(slots.drain(RequestError::ConnectionClosed), 0);

        assert_eq!(create_rx.wait().await, Some(Err(RequestError::ConnectionClosed)));
        assert_eq!(auth_rx.wait().await, Some(Err(RequestError::ConnectionClosed)));
        assert!(!slots.is_occupied(Family::NewAuthToken));
    }

    #[tokio::test]
    async fn test_expire_only_past_deadlines() {
        let now = Instant::now();
        let mut slots = PendingSlots::new();
        let (early, mut early_rx) = PendingRequest::channel();
        let (late, mut late_rx) = PendingRequest::channel();
        slots
            .occupy(Family::NewAuthToken, early, Some(now + Duration::from_secs(1)))
            .unwrap();
        slots
            .occupy(Family::Authenticate, late, Some(now + Duration::from_secs(5)))
            .unwrap();

        assert_eq!(slots.next_deadline(), Some(now + Duration::from_secs(1)));

        let expired = slots.expire(now + Duration::from_secs(2));
        assert_eq!(expired, vec![Family::NewAuthToken]);
        assert_eq!(early_rx.try_result(), Some(Err(RequestError::Timeout)));
        assert_eq!(late_rx.try_result(), None);
        assert_eq!(slots.next_deadline(), Some(now + Duration::from_secs(5)));
    }
}
