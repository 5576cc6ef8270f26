use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal,
};

use crate::types::{ProvEvent, ProvisioningCredentials, ProvisioningOutcome};

/// Depth of the GPO event queue; a full queue drops new events.
pub const PROV_EVENT_QUEUE_DEPTH: usize = 10;
/// Delay between the GPO write pulse and the record read, so the RF writer
/// can finish its transaction before we touch eeprom.
pub const WRITE_SETTLE_MS: u64 = 5_000;
/// Reconnect attempts after the initial connect before the attempt is
/// declared failed.
pub const CONNECT_RETRY_MAX: u8 = 2;
/// Scratch space for one NDEF record read.
pub const RECORD_SCRATCH_LEN: usize = 512;

pub(crate) static PROV_EVENTS: Channel<
    CriticalSectionRawMutex,
    ProvEvent,
    PROV_EVENT_QUEUE_DEPTH,
> = Channel::new();
pub(crate) static CREDENTIALS_READY: Channel<
    CriticalSectionRawMutex,
    ProvisioningCredentials,
    1,
> = Channel::new();
pub(crate) static PROV_OUTCOME: Signal<CriticalSectionRawMutex, ProvisioningOutcome> =
    Signal::new();
