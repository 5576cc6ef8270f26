use embassy_net::{Runner, Stack, StackResources};
use esp_hal::rng::Rng;
use esp_println::println;
use esp_radio::wifi::{Config as WifiConfig, WifiController, WifiDevice, WifiError};
use static_cell::StaticCell;

// A provisioning station never moves bulk traffic: one scan pass, the join
// handshake, and a short DHCP exchange. The driver gets a minimal buffer
// budget and aggregation stays off.
const RX_QUEUE_SIZE: usize = 2;
const TX_QUEUE_SIZE: usize = 1;
const STATIC_RX_BUF_NUM: u8 = 3;
const DYNAMIC_RX_BUF_NUM: u16 = 4;
const DYNAMIC_TX_BUF_NUM: u16 = 4;

// DHCP is the only socket the provisioning stack opens; one spare slot for
// its renewal churn.
const STACK_SOCKETS: usize = 2;

#[derive(Debug)]
pub enum RadioSetupError {
    /// Radio runtime failed to come up.
    Radio,
    /// Station interface could not be created.
    Station(WifiError),
}

/// Radio and network-stack handles the provisioning tasks run against.
pub struct ProvisioningRadio {
    pub controller: WifiController<'static>,
    pub runner: Runner<'static, WifiDevice<'static>>,
    pub stack: Stack<'static>,
}

fn station_driver_config() -> WifiConfig {
    WifiConfig::default()
        .with_rx_queue_size(RX_QUEUE_SIZE)
        .with_tx_queue_size(TX_QUEUE_SIZE)
        .with_static_rx_buf_num(STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
}

/// Bring up the radio and a DHCPv4 station stack sized for provisioning.
/// Callers that already own a controller and stack can hand theirs to the
/// tasks directly and skip this.
pub fn setup_radio(
    wifi: esp_hal::peripherals::WIFI<'static>,
) -> Result<ProvisioningRadio, RadioSetupError> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();

    let radio_ctrl = RADIO_CTRL.init(esp_radio::init().map_err(|err| {
        println!("st25dv_prov: radio init err={:?}", err);
        RadioSetupError::Radio
    })?);

    let (controller, ifaces) = esp_radio::wifi::new(radio_ctrl, wifi, station_driver_config())
        .map_err(|err| {
            println!("st25dv_prov: station interface err={:?}", err);
            RadioSetupError::Station(err)
        })?;

    let rng = Rng::new();
    let seed = u64::from(rng.random()) << 32 | u64::from(rng.random());

    let (stack, runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::new()),
        seed,
    );

    Ok(ProvisioningRadio {
        controller,
        runner,
        stack,
    })
}

/// Drives the network stack; must be running for address acquisition.
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
