//! Message types and tag identifiers carried by GBSP frames.
//!
//! The codec itself never interprets these; they are the fixed vocabulary
//! shared by the firmware and the host. Tags are scoped to their message
//! type, so the same tag number means different things under different
//! types.

/// Message kinds known to protocol version 1.
///
/// Types below `0x80` are reports sent by the board; types from `0x80` up are
/// commands sent by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    Hello = 0x01,
    OutputStatus = 0x12,
    OnewirePresence = 0x13,
    AuthToken = 0x14,
    Ping = 0x81,
    SetOutput = 0x83,
}

impl MessageType {
    /// Wire identifier of this type.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Look up a known type by its wire identifier.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::Hello),
            0x12 => Some(Self::OutputStatus),
            0x13 => Some(Self::OnewirePresence),
            0x14 => Some(Self::AuthToken),
            0x81 => Some(Self::Ping),
            0x83 => Some(Self::SetOutput),
            _ => None,
        }
    }

    /// True for host-to-board commands.
    #[inline]
    #[must_use]
    pub const fn is_command(self) -> bool {
        self.id() >= 0x80
    }
}

impl From<MessageType> for u8 {
    #[inline]
    fn from(t: MessageType) -> Self {
        t.id()
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(id)
    }
}

/// HELLO (0x01) tags.
///
/// Both names share tag `0x01` in the firmware catalog, so a HELLO frame can
/// carry only one of them unambiguously. Deployed boards put their firmware
/// version there.
pub mod hello {
    pub const PROTOCOL_VERSION: u8 = 0x01;
    pub const FIRMWARE_VERSION: u8 = 0x01;
}

/// OUTPUT_STATUS (0x12) tags.
pub mod output_status {
    pub const OUTPUT_NAME: u8 = 0x01;
    pub const OUTPUT_READING: u8 = 0x02;
}

/// ONEWIRE_PRESENCE (0x13) tags.
pub mod onewire_presence {
    pub const DEVICE_ID: u8 = 0x01;
    pub const STATUS: u8 = 0x02;
}

/// AUTH_TOKEN (0x14) tags.
pub mod auth_token {
    pub const DEVICE: u8 = 0x01;
    pub const TOKEN: u8 = 0x02;
    pub const STATUS: u8 = 0x03;
}

/// SET_OUTPUT (0x83) tags and mode values.
pub mod set_output {
    pub const OUTPUT_ID: u8 = 0x01;
    pub const OUTPUT_MODE: u8 = 0x02;

    pub const OUTPUT_DISABLED: u8 = 0;
    pub const OUTPUT_ENABLED: u8 = 1;
}
