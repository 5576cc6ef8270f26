use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::select::{select, Either};
use embassy_net::Stack;
use embassy_time::Instant;
use esp_println::println;
use esp_radio::wifi::{
    event::{self, EventExt},
    AuthMethod, ClientConfig, ModeConfig, ScanMethod, WifiController, WifiEvent,
};

use crate::{
    config::{CONNECT_RETRY_MAX, CREDENTIALS_READY, PROV_OUTCOME},
    types::{ConnectionState, ProvisioningCredentials, ProvisioningOutcome},
};

static PROV_EVENT_LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkEvent {
    StackStarted,
    Disconnected,
    AddressAcquired,
}

impl LinkEvent {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::StackStarted => "stack_started",
            Self::Disconnected => "disconnected",
            Self::AddressAcquired => "address_acquired",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkAction {
    Connect,
    RaiseConnected,
    RaiseFailed,
    Ignore,
}

/// Connect/retry state machine. All radio and stack events funnel through
/// [`ConnectionEngine::on_event`]; the async task only executes the
/// returned actions.
pub(crate) struct ConnectionEngine {
    state: ConnectionState,
    retries: u8,
}

impl ConnectionEngine {
    pub(crate) const fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            retries: 0,
        }
    }

    pub(crate) const fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) const fn retries(&self) -> u8 {
        self.retries
    }

    /// Credentials handed over and applied to the radio config.
    pub(crate) fn credentials_applied(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// A connect attempt has actually been issued to the radio.
    pub(crate) fn connect_issued(&mut self) {
        if self.state == ConnectionState::Retrying {
            self.state = ConnectionState::Connecting;
        }
    }

    pub(crate) fn on_event(&mut self, event: LinkEvent) -> LinkAction {
        if self.state.is_terminal() {
            return LinkAction::Ignore;
        }

        match event {
            LinkEvent::StackStarted => {
                self.state = ConnectionState::Connecting;
                LinkAction::Connect
            }
            LinkEvent::AddressAcquired => {
                self.retries = 0;
                self.state = ConnectionState::Connected;
                LinkAction::RaiseConnected
            }
            LinkEvent::Disconnected => {
                if self.retries < CONNECT_RETRY_MAX {
                    self.retries += 1;
                    self.state = ConnectionState::Retrying;
                    LinkAction::Connect
                } else {
                    self.state = ConnectionState::Failed;
                    LinkAction::RaiseFailed
                }
            }
        }
    }
}

/// Drive one provisioning attempt: wait for decoded credentials, apply them
/// to the radio, and run the connect/retry machine until it is terminal.
///
/// Address acquisition (DHCP config up) raises `Connected`; exhausting the
/// retry budget raises `Failed`. Both are terminal for this attempt: the
/// task then parks, keeping the controller (and any established
/// association) alive. A fresh attempt needs `initialize` and a new task.
pub async fn run_connection_task(mut controller: WifiController<'static>, stack: Stack<'static>) {
    let credentials = CREDENTIALS_READY.receive().await;
    let started_at = Instant::now();
    let mut engine = ConnectionEngine::new();

    install_prov_event_logger();

    // Tear the radio down to a known state before applying credentials.
    if matches!(controller.is_started(), Ok(true)) {
        let _ = controller.stop_async().await;
    }

    let mode = match client_config(&credentials) {
        Some(mode) => mode,
        None => {
            println!("st25dv_prov: credentials invalid utf8");
            fail_setup(&mut engine, started_at);
            return park().await;
        }
    };

    if let Err(err) = controller.set_config(&mode) {
        println!("st25dv_prov: station config err={:?}", err);
        fail_setup(&mut engine, started_at);
        return park().await;
    }
    log_transition(
        ConnectionState::Idle,
        ConnectionState::Connecting,
        "credentials_applied",
        started_at,
    );
    engine.credentials_applied();

    if let Err(err) = controller.start_async().await {
        println!("st25dv_prov: radio start err={:?}", err);
        fail_setup(&mut engine, started_at);
        return park().await;
    }

    let mut action = engine.on_event(LinkEvent::StackStarted);
    loop {
        match action {
            LinkAction::Connect => {
                let resumed_from = engine.state();
                engine.connect_issued();
                if resumed_from == ConnectionState::Retrying {
                    log_transition(
                        resumed_from,
                        engine.state(),
                        "connect_reissued",
                        started_at,
                    );
                }

                let event = match controller.connect_async().await {
                    Ok(()) => {
                        match select(
                            stack.wait_config_up(),
                            controller.wait_for_event(WifiEvent::StaDisconnected),
                        )
                        .await
                        {
                            Either::First(()) => LinkEvent::AddressAcquired,
                            Either::Second(_) => LinkEvent::Disconnected,
                        }
                    }
                    Err(err) => {
                        println!(
                            "st25dv_prov: connect err={:?} attempt={}",
                            err,
                            engine.retries()
                        );
                        LinkEvent::Disconnected
                    }
                };

                let from = engine.state();
                action = engine.on_event(event);
                log_transition(from, engine.state(), event.as_str(), started_at);
            }
            LinkAction::RaiseConnected => {
                PROV_OUTCOME.signal(ProvisioningOutcome::Connected);
                println!("st25dv_prov: outcome=connected");
                break;
            }
            LinkAction::RaiseFailed => {
                PROV_OUTCOME.signal(ProvisioningOutcome::Failed);
                println!(
                    "st25dv_prov: outcome=failed retries={}",
                    engine.retries()
                );
                break;
            }
            LinkAction::Ignore => break,
        }
    }

    park().await
}

/// Map the payload's numeric scheme onto the radio's auth mode, following
/// the esp_wifi auth mode order. Codes beyond the table are not rejected;
/// the join fails through the disconnect/retry path instead.
pub(crate) fn auth_method_from_code(code: u8) -> AuthMethod {
    match code {
        0 => AuthMethod::None,
        1 => AuthMethod::Wep,
        2 => AuthMethod::Wpa,
        3 => AuthMethod::Wpa2Personal,
        4 => AuthMethod::WpaWpa2Personal,
        5 => AuthMethod::Wpa2Enterprise,
        6 => AuthMethod::Wpa3Personal,
        7 => AuthMethod::Wpa2Wpa3Personal,
        8 => AuthMethod::WapiPersonal,
        _ => AuthMethod::Wpa2Personal,
    }
}

pub(crate) fn auth_method_code(method: AuthMethod) -> u8 {
    match method {
        AuthMethod::None => 0,
        AuthMethod::Wep => 1,
        AuthMethod::Wpa => 2,
        AuthMethod::Wpa2Personal => 3,
        AuthMethod::WpaWpa2Personal => 4,
        AuthMethod::Wpa2Enterprise => 5,
        AuthMethod::Wpa3Personal => 6,
        AuthMethod::Wpa2Wpa3Personal => 7,
        AuthMethod::WapiPersonal => 8,
        _ => 3,
    }
}

fn client_config(credentials: &ProvisioningCredentials) -> Option<ModeConfig> {
    let ssid = core::str::from_utf8(credentials.ssid()).ok()?;
    let password = core::str::from_utf8(credentials.password()).ok()?;
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        auth_method_from_code(credentials.auth_code())
    };

    Some(ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
            .with_auth_method(auth_method)
            .with_scan_method(ScanMethod::AllChannels),
    ))
}

// Radio setup errors have no retry path; they surface as the failed
// outcome rather than aborting the host process.
fn fail_setup(engine: &mut ConnectionEngine, started_at: Instant) {
    let from = engine.state();
    engine.state = ConnectionState::Failed;
    log_transition(from, engine.state(), "setup_error", started_at);
    PROV_OUTCOME.signal(ProvisioningOutcome::Failed);
    println!("st25dv_prov: outcome=failed");
}

fn log_transition(
    from: ConnectionState,
    to: ConnectionState,
    trigger: &str,
    started_at: Instant,
) {
    let at_ms = started_at.elapsed().as_millis() as u32;
    println!(
        "PROV_EVENT {{\"from\":\"{}\",\"to\":\"{}\",\"trigger\":\"{}\",\"at_ms\":{}}}",
        from.as_str(),
        to.as_str(),
        trigger,
        at_ms
    );
}

async fn park() {
    core::future::pending::<()>().await
}

fn install_prov_event_logger() {
    if !cfg!(debug_assertions) {
        return;
    }
    if PROV_EVENT_LOGGER_INSTALLED.swap(true, Ordering::Relaxed) {
        return;
    }

    event::StaStart::update_handler(|_| {
        println!("st25dv_prov: event sta_start");
    });

    event::StaDisconnected::update_handler(|event| {
        let reason = event.reason();
        println!(
            "st25dv_prov: event sta_disconnected reason={} ({})",
            reason,
            disconnect_reason_label(reason)
        );
    });
}

fn disconnect_reason_label(reason: u8) -> &'static str {
    match reason {
        200 => "beacon_timeout",
        201 => "no_ap_found",
        202 => "auth_fail",
        203 => "assoc_fail",
        204 => "handshake_timeout",
        205 => "connection_fail",
        210 => "no_ap_found_compatible_security",
        211 => "no_ap_found_authmode_threshold",
        212 => "no_ap_found_rssi_threshold",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connecting_engine() -> ConnectionEngine {
        let mut engine = ConnectionEngine::new();
        engine.credentials_applied();
        let action = engine.on_event(LinkEvent::StackStarted);
        assert_eq!(action, LinkAction::Connect);
        engine
    }

    #[test]
    fn first_attempt_success_reaches_connected() {
        let mut engine = connecting_engine();
        let action = engine.on_event(LinkEvent::AddressAcquired);
        assert_eq!(action, LinkAction::RaiseConnected);
        assert_eq!(engine.state(), ConnectionState::Connected);
        assert_eq!(engine.retries(), 0);
    }

    #[test]
    fn retry_budget_is_two_reconnects() {
        let mut engine = connecting_engine();

        assert_eq!(engine.on_event(LinkEvent::Disconnected), LinkAction::Connect);
        assert_eq!(engine.state(), ConnectionState::Retrying);
        engine.connect_issued();
        assert_eq!(engine.state(), ConnectionState::Connecting);

        assert_eq!(engine.on_event(LinkEvent::Disconnected), LinkAction::Connect);
        engine.connect_issued();

        assert_eq!(
            engine.on_event(LinkEvent::Disconnected),
            LinkAction::RaiseFailed
        );
        assert_eq!(engine.state(), ConnectionState::Failed);
        assert_eq!(engine.retries(), CONNECT_RETRY_MAX);
    }

    #[test]
    fn address_acquired_resets_retry_counter() {
        let mut engine = connecting_engine();
        let _ = engine.on_event(LinkEvent::Disconnected);
        engine.connect_issued();
        assert_eq!(engine.retries(), 1);

        let _ = engine.on_event(LinkEvent::AddressAcquired);
        assert_eq!(engine.retries(), 0);
        assert_eq!(engine.state(), ConnectionState::Connected);
    }

    #[test]
    fn terminal_states_absorb_events() {
        let mut engine = connecting_engine();
        let _ = engine.on_event(LinkEvent::AddressAcquired);
        assert_eq!(engine.on_event(LinkEvent::Disconnected), LinkAction::Ignore);
        assert_eq!(engine.state(), ConnectionState::Connected);

        let mut engine = connecting_engine();
        for _ in 0..3 {
            let _ = engine.on_event(LinkEvent::Disconnected);
            engine.connect_issued();
        }
        assert_eq!(engine.state(), ConnectionState::Failed);
        assert_eq!(
            engine.on_event(LinkEvent::AddressAcquired),
            LinkAction::Ignore
        );
        assert_eq!(engine.state(), ConnectionState::Failed);
    }

    #[test]
    fn auth_codes_round_trip_through_the_table() {
        for code in 0u8..=8 {
            assert_eq!(auth_method_code(auth_method_from_code(code)), code);
        }
        assert_eq!(auth_method_from_code(42), AuthMethod::Wpa2Personal);
    }
}
