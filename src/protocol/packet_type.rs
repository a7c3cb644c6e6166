//! Message type tags carried in the header's type byte.

/// Every type tag the client understands.
///
/// Tags are grouped by range: modifiers `0x00..=0x3F`, notifications
/// `0x40..=0x7F`, requests `0x80..=0xBF`, responses `0xC0..=0xFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    // Modifiers
    CreateEvent = 0x00,
    CancelEvent = 0x01,
    InviteUsers = 0x02,
    CancelUsersInvitation = 0x03,
    ConfirmAttendance = 0x04,
    ModifyEventDate = 0x05,
    ModifyEventMessage = 0x06,
    ModifyEvent = 0x07,
    VoteChange = 0x08,
    UserPosition = 0x09,
    UserPositionRange = 0x0A,
    UserCreateAccount = 0x0B,
    UserNewAuthToken = 0x0C,
    UserAuth = 0x0D,

    // Notifications
    EventCreated = 0x40,
    EventCancelled = 0x41,
    EventExpired = 0x42,
    EventDateModified = 0x43,
    EventMessageModified = 0x44,
    EventModified = 0x45,
    InvitationReceived = 0x46,
    InvitationCancelled = 0x47,
    AttendanceStatus = 0x48,
    EventChangeDateProposed = 0x49,
    EventChangeMessageProposed = 0x4A,
    EventChangeProposed = 0x4B,
    VotingStatus = 0x4C,
    VotingFinished = 0x4D,
    ChangeAccepted = 0x4E,
    ChangeDiscarded = 0x4F,
    AccessGranted = 0x50,
    Ok = 0x7E,
    Error = 0x7F,

    // Requests
    Ping = 0x80,
    ReadEvent = 0x81,
    ListAuthoredEvents = 0x82,
    ListPrivateEvents = 0x83,
    ListPublicEvents = 0x84,
    HistoryAuthoredEvents = 0x85,
    HistoryPrivateEvents = 0x86,
    HistoryPublicEvents = 0x87,

    // Responses
    Pong = 0xC0,
    EventInfo = 0xC1,
    EventsList = 0xC2,
}

impl PacketType {
    /// Map a raw tag to a known type. Unknown tags yield `None`.
    pub fn from_u8(tag: u8) -> Option<Self> {
        use PacketType::*;
        let ty = match tag {
            0x00 => CreateEvent,
            0x01 => CancelEvent,
            0x02 => InviteUsers,
            0x03 => CancelUsersInvitation,
            0x04 => ConfirmAttendance,
            0x05 => ModifyEventDate,
            0x06 => ModifyEventMessage,
            0x07 => ModifyEvent,
            0x08 => VoteChange,
            0x09 => UserPosition,
            0x0A => UserPositionRange,
            0x0B => UserCreateAccount,
            0x0C => UserNewAuthToken,
            0x0D => UserAuth,
            0x40 => EventCreated,
            0x41 => EventCancelled,
            0x42 => EventExpired,
            0x43 => EventDateModified,
            0x44 => EventMessageModified,
            0x45 => EventModified,
            0x46 => InvitationReceived,
            0x47 => InvitationCancelled,
            0x48 => AttendanceStatus,
            0x49 => EventChangeDateProposed,
            0x4A => EventChangeMessageProposed,
            0x4B => EventChangeProposed,
            0x4C => VotingStatus,
            0x4D => VotingFinished,
            0x4E => ChangeAccepted,
            0x4F => ChangeDiscarded,
            0x50 => AccessGranted,
            0x7E => Ok,
            0x7F => Error,
            0x80 => Ping,
            0x81 => ReadEvent,
            0x82 => ListAuthoredEvents,
            0x83 => ListPrivateEvents,
            0x84 => ListPublicEvents,
            0x85 => HistoryAuthoredEvents,
            0x86 => HistoryPrivateEvents,
            0x87 => HistoryPublicEvents,
            0xC0 => Pong,
            0xC1 => EventInfo,
            0xC2 => EventsList,
            _ => return None,
        };
        Some(ty)
    }

    /// Raw tag value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Session-level requests that need `Connected && authenticated`.
    ///
    /// Account creation, token issuance and authentication have their own
    /// preconditions and are excluded.
    pub fn is_session_request(self) -> bool {
        let tag = self.as_u8();
        let modifier = tag < 0x40 && !self.is_auth_family();
        let request = (0x80..0xC0).contains(&tag);
        modifier || request
    }

    /// Account creation, new token or authentication.
    pub fn is_auth_family(self) -> bool {
        matches!(
            self,
            PacketType::UserCreateAccount | PacketType::UserNewAuthToken | PacketType::UserAuth
        )
    }
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(tag: u8) -> std::result::Result<Self, u8> {
        PacketType::from_u8(tag).ok_or(tag)
    }
}

impl From<PacketType> for u8 {
    fn from(ty: PacketType) -> u8 {
        ty.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_roundtrip() {
        for tag in 0u8..=0xFF {
            if let Some(ty) = PacketType::from_u8(tag) {
                assert_eq!(ty.as_u8(), tag);
            }
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(PacketType::from_u8(0x3A), None);
        assert_eq!(PacketType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_session_request_classification() {
        assert!(PacketType::CreateEvent.is_session_request());
        assert!(PacketType::UserPositionRange.is_session_request());
        assert!(PacketType::Ping.is_session_request());
        assert!(PacketType::HistoryPublicEvents.is_session_request());

        assert!(!PacketType::UserAuth.is_session_request());
        assert!(!PacketType::UserCreateAccount.is_session_request());
        assert!(!PacketType::EventCreated.is_session_request());
        assert!(!PacketType::Pong.is_session_request());
    }
}
