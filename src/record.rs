use embassy_time::{Duration, Timer};
use esp_println::println;
use heapless::String;
use serde::Deserialize;

use crate::{
    config::{CREDENTIALS_READY, PROV_EVENTS, RECORD_SCRATCH_LEN, WRITE_SETTLE_MS},
    tag::{RawRecord, RecordKind, TagNdef},
    types::{CredentialBoundsError, ProvEvent, ProvisioningCredentials},
    PASSWORD_MAX, PROV_MIME_TYPE, SSID_MAX,
};

// Decode capacities sit above the radio bounds so an oversized field is
// reported as a length violation, not a parse error. Fields beyond even
// this headroom fail the parse.
const SSID_DECODE_MAX: usize = SSID_MAX * 2;
const PASSWORD_DECODE_MAX: usize = PASSWORD_MAX * 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Record is not MIME-typed; some other application wrote the tag.
    ForeignTransport,
    /// MIME record with a content type this crate does not own.
    ForeignContentType,
    /// Payload is not a JSON object with `ssid`/`password` strings and a
    /// numeric `auth`.
    Payload,
    SsidTooLong,
    PasswordTooLong,
}

impl DecodeError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForeignTransport => "foreign_transport",
            Self::ForeignContentType => "foreign_content_type",
            Self::Payload => "payload",
            Self::SsidTooLong => "ssid_too_long",
            Self::PasswordTooLong => "password_too_long",
        }
    }

    /// Foreign records pass by without a log line; everything else is a
    /// malformed payload worth reporting.
    pub const fn is_foreign(self) -> bool {
        matches!(self, Self::ForeignTransport | Self::ForeignContentType)
    }
}

// Owned strings so escape sequences in the JSON (`\"`, `\\` are legal
// passphrase characters) are unescaped during deserialization.
#[derive(Deserialize)]
struct CredentialPayload {
    ssid: String<SSID_DECODE_MAX>,
    password: String<PASSWORD_DECODE_MAX>,
    auth: u8,
}

/// Validate one record and extract join parameters from it.
///
/// Checks run in order: record class, content type, JSON shape and field
/// typing, then length bounds. An `auth` value outside the known scheme
/// table is accepted here; the join fails later through the retry path.
pub fn decode_credentials(
    record: &RawRecord<'_>,
) -> Result<ProvisioningCredentials, DecodeError> {
    if record.kind != RecordKind::Mime {
        return Err(DecodeError::ForeignTransport);
    }
    if record.record_type != PROV_MIME_TYPE {
        return Err(DecodeError::ForeignContentType);
    }

    let (payload, _) = serde_json_core::from_slice::<CredentialPayload>(record.payload)
        .map_err(|_| DecodeError::Payload)?;

    ProvisioningCredentials::from_parts(
        payload.ssid.as_bytes(),
        payload.password.as_bytes(),
        payload.auth,
    )
    .map_err(|err| match err {
        CredentialBoundsError::SsidTooLong => DecodeError::SsidTooLong,
        CredentialBoundsError::PasswordTooLong => DecodeError::PasswordTooLong,
    })
}

/// Consume GPO events until one tag write decodes into valid credentials,
/// hand those to the connection task, then complete.
///
/// Rejected records of any kind keep the listener alive; only a successful
/// decode ends it. Tokens other than [`ProvEvent::TagWritten`] are skipped
/// without touching the tag.
pub async fn run_credential_listener<T: TagNdef>(tag: &mut T) {
    loop {
        match PROV_EVENTS.receive().await {
            ProvEvent::TagWritten => {}
            ProvEvent::FieldActivity => continue,
        }

        // Let the RF writer finish its transaction before reading eeprom.
        Timer::after(Duration::from_millis(WRITE_SETTLE_MS)).await;

        let mut scratch = [0u8; RECORD_SCRATCH_LEN];
        let record = match tag.read_first_record(&mut scratch) {
            Ok(record) => record,
            Err(err) => {
                println!("st25dv_prov: record read err={:?}", err);
                continue;
            }
        };

        match decode_credentials(&record) {
            Ok(credentials) => {
                println!(
                    "st25dv_prov: credentials accepted ssid_len={} auth={}",
                    credentials.ssid().len(),
                    credentials.auth_code()
                );
                CREDENTIALS_READY.send(credentials).await;
                return;
            }
            Err(err) if err.is_foreign() => {}
            Err(err) => {
                println!(
                    "st25dv_prov: credential record rejected reason={}",
                    err.as_str()
                );
            }
        }
    }
}
