//! Typed gateboard messages.
//!
//! Each message maps to one [`MessageType`] and reads/writes its fields as
//! TLV records of a [`Packet`]. Multi-byte integers are little-endian.

use gbsp_proto::catalog::{auth_token, hello, onewire_presence, output_status, set_output};
use gbsp_proto::{AppendError, MessageType, Packet, Serialize, SerializeError};
use heapless::Vec;

/// Maximum length of a byte-string field (names, tokens).
pub const MAX_FIELD_LEN: usize = 32;

/// Byte-string field of a message.
pub type Field = Vec<u8, MAX_FIELD_LEN>;

/// Error decoding a typed message from a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// The packet type does not match the message being decoded.
    WrongType { expected: u8, found: u8 },
    /// A required tag is absent.
    MissingTag { tag: u8 },
    /// A tag's value has an unexpected width.
    BadLength { tag: u8 },
    /// A tag's value is outside the allowed range.
    BadValue { tag: u8 },
}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WrongType { expected, found } => {
                write!(f, "expected type {expected:#04x}, found {found:#04x}")
            }
            Self::MissingTag { tag } => write!(f, "missing tag {tag:#04x}"),
            Self::BadLength { tag } => write!(f, "bad value length for tag {tag:#04x}"),
            Self::BadValue { tag } => write!(f, "bad value for tag {tag:#04x}"),
        }
    }
}

/// A message with a fixed type and a fixed set of tags.
pub trait TypedMessage: Sized {
    /// Wire type of this message.
    const TYPE: MessageType;

    /// Append this message's records to `packet`.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::CapacityExceeded`] if the records do not fit.
    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError>;

    /// Read this message's fields from a packet of type [`Self::TYPE`].
    ///
    /// # Errors
    ///
    /// Returns a [`MessageError`] for missing or invalid tags.
    fn read_tags(packet: &Packet) -> Result<Self, MessageError>;

    /// Encode into a fresh packet.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::CapacityExceeded`] if the records do not fit.
    fn to_packet(&self) -> Result<Packet, AppendError> {
        let mut packet = Packet::from(Self::TYPE);
        self.write_tags(&mut packet)?;
        Ok(packet)
    }

    /// Decode from a packet, checking its type first.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::WrongType`] for a packet of another type, or
    /// the error of [`read_tags`](Self::read_tags).
    fn from_packet(packet: &Packet) -> Result<Self, MessageError> {
        if packet.msg_type() != Self::TYPE.id() {
            return Err(MessageError::WrongType {
                expected: Self::TYPE.id(),
                found: packet.msg_type(),
            });
        }
        Self::read_tags(packet)
    }
}

/// State of an output, as commanded by SET_OUTPUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputMode {
    Disabled = set_output::OUTPUT_DISABLED,
    Enabled = set_output::OUTPUT_ENABLED,
}

impl TryFrom<u8> for OutputMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            set_output::OUTPUT_DISABLED => Ok(Self::Disabled),
            set_output::OUTPUT_ENABLED => Ok(Self::Enabled),
            other => Err(other),
        }
    }
}

/// Whether a device or token was added to or removed from the bus.
///
/// Status byte 1 means present; any other value means absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PresenceStatus {
    Absent,
    Present,
}

impl PresenceStatus {
    #[inline]
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Absent => 0,
            Self::Present => 1,
        }
    }
}

impl From<u8> for PresenceStatus {
    fn from(value: u8) -> Self {
        if value == 1 {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

/// HELLO (0x01): sent by the board on start-up and in reply to PING.
///
/// The catalog gives tag 0x01 two names (protocol version and firmware
/// version). Hosts read it as the firmware version, 1 or 2 bytes wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hello {
    pub firmware_version: u16,
}

impl TypedMessage for Hello {
    const TYPE: MessageType = MessageType::Hello;

    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError> {
        packet.append_u16(hello::FIRMWARE_VERSION, self.firmware_version)
    }

    fn read_tags(packet: &Packet) -> Result<Self, MessageError> {
        let version = read_uint(packet, hello::FIRMWARE_VERSION, 2)?;
        Ok(Self {
            firmware_version: version as u16,
        })
    }
}

/// OUTPUT_STATUS (0x12): current reading of a named output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputStatus {
    pub name: Field,
    pub reading: u8,
}

impl TypedMessage for OutputStatus {
    const TYPE: MessageType = MessageType::OutputStatus;

    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError> {
        packet.append_tag(output_status::OUTPUT_NAME, &self.name)?;
        packet.append_u8(output_status::OUTPUT_READING, self.reading)
    }

    fn read_tags(packet: &Packet) -> Result<Self, MessageError> {
        Ok(Self {
            name: read_field(packet, output_status::OUTPUT_NAME)?,
            reading: read_u8(packet, output_status::OUTPUT_READING)?,
        })
    }
}

/// ONEWIRE_PRESENCE (0x13): a onewire device appeared on or left the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OnewirePresence {
    pub device_id: u64,
    pub status: PresenceStatus,
}

impl TypedMessage for OnewirePresence {
    const TYPE: MessageType = MessageType::OnewirePresence;

    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError> {
        packet.append_u64(onewire_presence::DEVICE_ID, self.device_id)?;
        packet.append_u8(onewire_presence::STATUS, self.status.to_byte())
    }

    fn read_tags(packet: &Packet) -> Result<Self, MessageError> {
        Ok(Self {
            device_id: read_uint(packet, onewire_presence::DEVICE_ID, 8)?,
            status: read_u8(packet, onewire_presence::STATUS)?.into(),
        })
    }
}

/// AUTH_TOKEN (0x14): a token was presented to or removed from a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuthToken {
    /// Name of the reading device, e.g. `onewire`.
    pub device: Field,
    /// Raw token bytes.
    pub token: Field,
    pub status: PresenceStatus,
}

impl TypedMessage for AuthToken {
    const TYPE: MessageType = MessageType::AuthToken;

    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError> {
        packet.append_tag(auth_token::DEVICE, &self.device)?;
        packet.append_tag(auth_token::TOKEN, &self.token)?;
        packet.append_u8(auth_token::STATUS, self.status.to_byte())
    }

    fn read_tags(packet: &Packet) -> Result<Self, MessageError> {
        Ok(Self {
            device: read_field(packet, auth_token::DEVICE)?,
            token: read_field(packet, auth_token::TOKEN)?,
            status: read_u8(packet, auth_token::STATUS)?.into(),
        })
    }
}

/// PING (0x81): asks the board to announce itself. No payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ping;

impl TypedMessage for Ping {
    const TYPE: MessageType = MessageType::Ping;

    fn write_tags(&self, _packet: &mut Packet) -> Result<(), AppendError> {
        Ok(())
    }

    fn read_tags(_packet: &Packet) -> Result<Self, MessageError> {
        Ok(Self)
    }
}

/// SET_OUTPUT (0x83): enable or disable an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetOutput {
    pub output_id: u8,
    pub mode: OutputMode,
}

impl TypedMessage for SetOutput {
    const TYPE: MessageType = MessageType::SetOutput;

    fn write_tags(&self, packet: &mut Packet) -> Result<(), AppendError> {
        packet.append_u8(set_output::OUTPUT_ID, self.output_id)?;
        packet.append_u8(set_output::OUTPUT_MODE, self.mode as u8)
    }

    fn read_tags(packet: &Packet) -> Result<Self, MessageError> {
        let mode = read_u8(packet, set_output::OUTPUT_MODE)?;
        Ok(Self {
            output_id: read_u8(packet, set_output::OUTPUT_ID)?,
            mode: OutputMode::try_from(mode).map_err(|_| MessageError::BadValue {
                tag: set_output::OUTPUT_MODE,
            })?,
        })
    }
}

/// Any message that can travel over the link.
///
/// Packets of a type the catalog does not know are kept whole in
/// [`Message::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Hello(Hello),
    OutputStatus(OutputStatus),
    OnewirePresence(OnewirePresence),
    AuthToken(AuthToken),
    Ping,
    SetOutput(SetOutput),
    Unknown(Packet),
}

impl Message {
    /// Decode a packet into the matching message.
    ///
    /// # Errors
    ///
    /// Returns a [`MessageError`] if a known type is missing tags or carries
    /// invalid values.
    pub fn from_packet(packet: &Packet) -> Result<Self, MessageError> {
        let Some(msg_type) = packet.message_type() else {
            return Ok(Self::Unknown(packet.clone()));
        };

        Ok(match msg_type {
            MessageType::Hello => Self::Hello(Hello::read_tags(packet)?),
            MessageType::OutputStatus => Self::OutputStatus(OutputStatus::read_tags(packet)?),
            MessageType::OnewirePresence => {
                Self::OnewirePresence(OnewirePresence::read_tags(packet)?)
            }
            MessageType::AuthToken => Self::AuthToken(AuthToken::read_tags(packet)?),
            MessageType::Ping => Self::Ping,
            MessageType::SetOutput => Self::SetOutput(SetOutput::read_tags(packet)?),
        })
    }

    /// Encode into a packet.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::CapacityExceeded`] if the fields do not fit.
    pub fn to_packet(&self) -> Result<Packet, AppendError> {
        match self {
            Self::Hello(m) => m.to_packet(),
            Self::OutputStatus(m) => m.to_packet(),
            Self::OnewirePresence(m) => m.to_packet(),
            Self::AuthToken(m) => m.to_packet(),
            Self::Ping => Ping.to_packet(),
            Self::SetOutput(m) => m.to_packet(),
            Self::Unknown(packet) => Ok(packet.clone()),
        }
    }

    /// Raw wire type of this message.
    #[must_use]
    pub fn msg_type(&self) -> u8 {
        match self {
            Self::Hello(_) => Hello::TYPE.id(),
            Self::OutputStatus(_) => OutputStatus::TYPE.id(),
            Self::OnewirePresence(_) => OnewirePresence::TYPE.id(),
            Self::AuthToken(_) => AuthToken::TYPE.id(),
            Self::Ping => Ping::TYPE.id(),
            Self::SetOutput(_) => SetOutput::TYPE.id(),
            Self::Unknown(packet) => packet.msg_type(),
        }
    }

    /// True for host-to-board commands.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.msg_type() >= 0x80
    }
}

impl Serialize for Message {
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        self.to_packet()?.serialize(buf)
    }
}

impl From<Hello> for Message {
    fn from(m: Hello) -> Self {
        Self::Hello(m)
    }
}

impl From<OutputStatus> for Message {
    fn from(m: OutputStatus) -> Self {
        Self::OutputStatus(m)
    }
}

impl From<OnewirePresence> for Message {
    fn from(m: OnewirePresence) -> Self {
        Self::OnewirePresence(m)
    }
}

impl From<AuthToken> for Message {
    fn from(m: AuthToken) -> Self {
        Self::AuthToken(m)
    }
}

impl From<Ping> for Message {
    fn from(_: Ping) -> Self {
        Self::Ping
    }
}

impl From<SetOutput> for Message {
    fn from(m: SetOutput) -> Self {
        Self::SetOutput(m)
    }
}

/// Value of a required tag.
#[inline]
fn required(packet: &Packet, tag: u8) -> Result<&[u8], MessageError> {
    packet.tag_value(tag).ok_or(MessageError::MissingTag { tag })
}

/// Single-byte value of a required tag.
fn read_u8(packet: &Packet, tag: u8) -> Result<u8, MessageError> {
    match required(packet, tag)? {
        [value] => Ok(*value),
        _ => Err(MessageError::BadLength { tag }),
    }
}

/// Little-endian integer value of a required tag, at most `max_width` bytes.
fn read_uint(packet: &Packet, tag: u8, max_width: usize) -> Result<u64, MessageError> {
    let value = required(packet, tag)?;
    if value.len() > max_width {
        return Err(MessageError::BadLength { tag });
    }
    packet
        .read_tag_le(tag)
        .ok_or(MessageError::BadLength { tag })
}

/// Byte-string value of a required tag.
fn read_field(packet: &Packet, tag: u8) -> Result<Field, MessageError> {
    Vec::from_slice(required(packet, tag)?).map_err(|()| MessageError::BadLength { tag })
}
