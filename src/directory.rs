use embassy_time::Duration;
use esp_println::println;
use esp_radio::wifi::{ScanConfig, ScanTypeConfig, WifiController, WifiError};
use heapless::{String, Vec};
use serde::Serialize;

use crate::{
    connection::auth_method_code,
    tag::{TagNdef, CC_FILE_LEN},
    SSID_MAX,
};

/// Most networks one scan pass will publish to the tag.
pub const SCAN_LIST_MAX: usize = 20;
/// The serialized directory must fit one NDEF record in user memory.
pub const DIRECTORY_JSON_MAX: usize = 1536;
/// Content type of the published directory record.
pub const DIRECTORY_MIME_TYPE: &str = "application/json";

// Active scan dwell is per channel; short bounds keep the blocking scan
// under a couple of seconds across all channels.
const SCAN_ACTIVE_MIN_MS: u64 = 80;
const SCAN_ACTIVE_MAX_MS: u64 = 240;

#[derive(Debug)]
pub enum DirectoryError<E> {
    /// Radio could not start or complete the scan.
    Scan(WifiError),
    /// Serialized directory did not fit [`DIRECTORY_JSON_MAX`].
    Serialize,
    /// Tag memory write failed.
    TagWrite(E),
}

#[derive(Serialize)]
struct ApRecord {
    ssid: String<SSID_MAX>,
    rssi: i8,
    auth: u8,
}

/// Scan nearby networks once and write them into tag memory as a JSON
/// array, one object per network in scan order, as the sole record of the
/// message. One-shot: every failure is surfaced to the caller, nothing is
/// retried. Returns the number of published records.
pub async fn publish_directory<T: TagNdef>(
    controller: &mut WifiController<'static>,
    tag: &mut T,
) -> Result<usize, DirectoryError<T::Error>> {
    if !matches!(controller.is_started(), Ok(true)) {
        controller
            .start_async()
            .await
            .map_err(DirectoryError::Scan)?;
    }

    let config = ScanConfig::default()
        .with_max(SCAN_LIST_MAX)
        .with_scan_type(ScanTypeConfig::Active {
            min: Duration::from_millis(SCAN_ACTIVE_MIN_MS).into(),
            max: Duration::from_millis(SCAN_ACTIVE_MAX_MS).into(),
        });
    let found = controller
        .scan_with_config_async(config)
        .await
        .map_err(DirectoryError::Scan)?;

    let mut records: Vec<ApRecord, SCAN_LIST_MAX> = Vec::new();
    for ap in found.iter().take(SCAN_LIST_MAX) {
        let mut ssid: String<SSID_MAX> = String::new();
        let _ = ssid.push_str(ap.ssid.as_str());
        let _ = records.push(ApRecord {
            ssid,
            rssi: ap.signal_strength,
            auth: auth_method_code(ap.auth_method),
        });
    }

    let mut buffer = [0u8; DIRECTORY_JSON_MAX];
    let len = serde_json_core::to_slice(&records, &mut buffer)
        .map_err(|_| DirectoryError::Serialize)?;

    tag.write_sole_record(CC_FILE_LEN, DIRECTORY_MIME_TYPE, &buffer[..len])
        .map_err(DirectoryError::TagWrite)?;

    println!(
        "st25dv_prov: directory published count={} bytes={}",
        records.len(),
        len
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ssid: &str, rssi: i8, auth: u8) -> ApRecord {
        let mut name: String<SSID_MAX> = String::new();
        name.push_str(ssid).expect("fixture ssid fits");
        ApRecord {
            ssid: name,
            rssi,
            auth,
        }
    }

    #[test]
    fn directory_serializes_one_object_per_network_in_order() {
        let mut records: Vec<ApRecord, SCAN_LIST_MAX> = Vec::new();
        records.push(record("Home", -40, 3)).unwrap();
        records.push(record("Guest", -72, 0)).unwrap();

        let mut buffer = [0u8; DIRECTORY_JSON_MAX];
        let len = serde_json_core::to_slice(&records, &mut buffer).unwrap();

        assert_eq!(
            &buffer[..len],
            br#"[{"ssid":"Home","rssi":-40,"auth":3},{"ssid":"Guest","rssi":-72,"auth":0}]"#
        );
    }

    #[test]
    fn empty_scan_serializes_to_an_empty_array() {
        let records: Vec<ApRecord, SCAN_LIST_MAX> = Vec::new();
        let mut buffer = [0u8; DIRECTORY_JSON_MAX];
        let len = serde_json_core::to_slice(&records, &mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"[]");
    }

    #[test]
    fn full_scan_list_fits_the_record_buffer() {
        let mut records: Vec<ApRecord, SCAN_LIST_MAX> = Vec::new();
        for _ in 0..SCAN_LIST_MAX {
            records
                .push(record("abcdefghijklmnopqrstuvwxyz012345", -99, 8))
                .unwrap();
        }

        let mut buffer = [0u8; DIRECTORY_JSON_MAX];
        let len = serde_json_core::to_slice(&records, &mut buffer).unwrap();
        assert!(len <= DIRECTORY_JSON_MAX);
    }
}
