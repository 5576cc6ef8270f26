//! Seam to the ST25DV driver. Register access and NDEF record
//! encode/decode live behind [`TagNdef`]; this crate only interprets what
//! comes back.

use core::fmt::Debug;

/// Capability-container length of the ST25DV user area; the NDEF message
/// starts right after it.
pub const CC_FILE_LEN: u16 = 8;

// GPO1 configuration register bits.
pub const GPO_RF_USER_EN: u8 = 0x01;
pub const GPO_RF_ACTIVITY_EN: u8 = 0x02;
pub const GPO_RF_INTERRUPT_EN: u8 = 0x04;
pub const GPO_FIELD_CHANGE_EN: u8 = 0x08;
pub const GPO_RF_PUT_MSG_EN: u8 = 0x10;
pub const GPO_RF_GET_MSG_EN: u8 = 0x20;
pub const GPO_RF_WRITE_EN: u8 = 0x40;
pub const GPO_EN: u8 = 0x80;

/// GPO setting applied by `initialize`: pulse on RF user and RF activity
/// events, which covers the writer's credential-record update.
pub const GPO_PROVISIONING_CONFIG: u8 = GPO_RF_USER_EN | GPO_RF_ACTIVITY_EN;

/// NDEF type-name-format class of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Empty,
    WellKnown,
    Mime,
    Uri,
    External,
    Unknown,
}

/// One NDEF record, viewed through a caller-supplied scratch buffer.
pub struct RawRecord<'a> {
    pub kind: RecordKind,
    /// Content type for MIME records, type name otherwise.
    pub record_type: &'a str,
    pub payload: &'a [u8],
}

pub trait TagNdef {
    type Error: Debug;

    /// Write the GPO1 configuration register.
    fn configure_gpo(&mut self, config: u8) -> Result<(), Self::Error>;

    /// Read the first record of the NDEF message into `scratch`.
    fn read_first_record<'buf>(
        &mut self,
        scratch: &'buf mut [u8],
    ) -> Result<RawRecord<'buf>, Self::Error>;

    /// Write `payload` as the sole (first and last) MIME record of the
    /// message, starting at `address` in user memory.
    fn write_sole_record(
        &mut self,
        address: u16,
        content_type: &str,
        payload: &[u8],
    ) -> Result<(), Self::Error>;
}
