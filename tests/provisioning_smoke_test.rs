//! On-target checks for the provisioning event flow: queue overflow policy,
//! record validation, and the listener's one-success lifecycle, all against
//! a scripted tag.

#![no_std]
#![no_main]

#[cfg(test)]
#[embedded_test::tests(executor = esp_rtos::embassy::Executor::new())]
mod tests {
    use core::convert::Infallible;

    use embassy_time::{with_timeout, Duration};
    use st25dv_prov::{
        config::PROV_EVENT_QUEUE_DEPTH,
        enqueue_event, initialize, run_credential_listener,
        tag::{RawRecord, RecordKind, TagNdef, GPO_PROVISIONING_CONFIG},
        ProvEvent, PROV_MIME_TYPE,
    };

    struct ScriptedTag {
        kind: RecordKind,
        record_type: &'static str,
        payload: &'static [u8],
        gpo_config: Option<u8>,
    }

    impl ScriptedTag {
        fn with_record(
            kind: RecordKind,
            record_type: &'static str,
            payload: &'static [u8],
        ) -> Self {
            Self {
                kind,
                record_type,
                payload,
                gpo_config: None,
            }
        }
    }

    impl TagNdef for ScriptedTag {
        type Error = Infallible;

        fn configure_gpo(&mut self, config: u8) -> Result<(), Self::Error> {
            self.gpo_config = Some(config);
            Ok(())
        }

        fn read_first_record<'buf>(
            &mut self,
            scratch: &'buf mut [u8],
        ) -> Result<RawRecord<'buf>, Self::Error> {
            let len = self.payload.len();
            scratch[..len].copy_from_slice(self.payload);
            Ok(RawRecord {
                kind: self.kind,
                record_type: self.record_type,
                payload: &scratch[..len],
            })
        }

        fn write_sole_record(
            &mut self,
            _address: u16,
            _content_type: &str,
            _payload: &[u8],
        ) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    // Settle delay is 5s; give each listener run a margin past it.
    const LISTENER_TIMEOUT: Duration = Duration::from_secs(8);

    #[init]
    fn init() {
        let peripherals = esp_hal::init(esp_hal::Config::default());
        let timg0 = esp_hal::timer::timg::TimerGroup::new(peripherals.TIMG0);
        esp_rtos::start(timg0.timer0);
    }

    #[test]
    async fn initialize_configures_gpo_and_is_idempotent() {
        let mut tag = ScriptedTag::with_record(RecordKind::Empty, "", b"");
        initialize(&mut tag).unwrap();
        assert_eq!(tag.gpo_config, Some(GPO_PROVISIONING_CONFIG));
        initialize(&mut tag).unwrap();
        assert_eq!(tag.gpo_config, Some(GPO_PROVISIONING_CONFIG));
    }

    #[test]
    async fn full_queue_drops_events_without_blocking() {
        let mut tag = ScriptedTag::with_record(RecordKind::Empty, "", b"");
        initialize(&mut tag).unwrap();

        for _ in 0..PROV_EVENT_QUEUE_DEPTH {
            assert!(enqueue_event(ProvEvent::FieldActivity));
        }
        // Sustained overflow: every further send reports the drop and
        // returns immediately.
        for _ in 0..4 {
            assert!(!enqueue_event(ProvEvent::TagWritten));
        }

        initialize(&mut tag).unwrap();
        assert!(enqueue_event(ProvEvent::TagWritten));
        initialize(&mut tag).unwrap();
    }

    #[test]
    async fn listener_survives_rejected_payloads() {
        let mut tag = ScriptedTag::with_record(
            RecordKind::Mime,
            PROV_MIME_TYPE,
            br#"{"ssid":"Home","password":"pw","auth":"wpa2"}"#,
        );
        initialize(&mut tag).unwrap();
        assert!(enqueue_event(ProvEvent::TagWritten));

        // The mistyped payload is discarded and the listener keeps
        // blocking on the queue, so the run times out.
        let result = with_timeout(LISTENER_TIMEOUT, run_credential_listener(&mut tag)).await;
        assert!(result.is_err());

        initialize(&mut tag).unwrap();
    }

    #[test]
    async fn listener_skips_foreign_tokens_and_stops_after_success() {
        let mut tag = ScriptedTag::with_record(
            RecordKind::Mime,
            PROV_MIME_TYPE,
            br#"{"ssid":"Home","password":"secret123","auth":3}"#,
        );
        initialize(&mut tag).unwrap();

        assert!(enqueue_event(ProvEvent::FieldActivity));
        assert!(enqueue_event(ProvEvent::TagWritten));

        // One valid decode completes the listener future.
        let result = with_timeout(LISTENER_TIMEOUT, run_credential_listener(&mut tag)).await;
        assert!(result.is_ok());

        initialize(&mut tag).unwrap();
    }
}
