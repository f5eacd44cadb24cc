//! GrowUnit Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter        WifiLink         MqttBridge                 │
//! │  (Config+Storage)  (network flag)   (session flag, queues)     │
//! │  OneWirePin        RelayPin                                    │
//! │  (OneWireBus)      (RelayDriver)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              UnitService (orchestration)               │    │
//! │  │  status loop · inbound loop · dispatch · error sink    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use growunit::adapters::device_id;
use growunit::adapters::mqtt::{MqttBridge, SessionTracker};
use growunit::adapters::nvs::NvsAdapter;
use growunit::adapters::wifi::{WifiCredentials, WifiLink};
use growunit::app::ports::{ConfigError, ConfigPort};
use growunit::app::service::UnitService;
use growunit::config::{UnitConfig, UNIT_ID_KEY};
use growunit::connectivity::ConnectivityState;
use growunit::drivers::onewire::OneWirePin;
use growunit::drivers::relay::RelayPin;
use growunit::error::Error;
use growunit::modules::relay::Relay;
use growunit::sensors::ds18b20::TemperatureSensor;
use growunit::transport::MessageQueues;

/// Reachable from the MQTT client's callback thread.
static QUEUES: MessageQueues = MessageQueues::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  GrowUnit v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(ConfigError::NotFound) => {
            info!("No stored config, using defaults");
            UnitConfig::default()
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            UnitConfig::default()
        }
    };

    let mac = device_id::read_mac();
    device_id::ensure_unit_id(&mut config.identity, &mac);
    let unit_id = config
        .identity
        .get(UNIT_ID_KEY)
        .unwrap_or_default()
        .to_owned();

    // ── 3. Modules ────────────────────────────────────────────
    // SAFETY: the configured GPIOs are validated distinct and are not
    // claimed through `peripherals.pins` anywhere else.
    let bus_pin = PinDriver::input_output_od(unsafe { AnyIOPin::new(config.sensor.gpio) })?;
    let bus = OneWirePin::new(bus_pin, Ets)
        .map_err(|e| anyhow::anyhow!("one-wire bus init failed: {}", e))?;
    let sensor = TemperatureSensor::new(config.sensor.name.clone(), Box::new(bus))
        .with_settle_delay(Duration::from_millis(u64::from(config.sensor.settle_delay_ms)));

    // SAFETY: see above.
    let relay_pin = PinDriver::output(unsafe { AnyOutputPin::new(config.relay.gpio) })?;
    let relay = Relay::new(
        config.relay.name.clone(),
        Box::new(RelayPin::new(relay_pin, config.relay.gpio)),
        config.relay.active_level,
        Box::new(nvs.clone()),
        config.relay.persistence_key.clone(),
    );

    // ── 4. Connectivity ───────────────────────────────────────
    let connectivity = ConnectivityState::new();

    let wifi = match WifiCredentials::new(&config.network.wifi_ssid, &config.network.wifi_password) {
        Ok(credentials) => {
            let mut link = WifiLink::new(
                peripherals.modem,
                sysloop,
                nvs_partition,
                credentials,
                connectivity.clone(),
            )
            .map_err(|e| anyhow::anyhow!("WiFi init failed: {}", e))?;
            if let Err(e) = link.connect() {
                warn!("WiFi: initial connect failed ({}), retrying in background", e);
            }
            Some(link)
        }
        Err(e) => {
            warn!("WiFi disabled: {}", e);
            None
        }
    };

    let _wifi_supervisor = match wifi {
        Some(link) => Some(link.spawn_supervisor()?),
        None => None,
    };

    let tracker = SessionTracker::new(&QUEUES, connectivity.clone());
    let mut bridge = MqttBridge::connect(&config.network.broker_url, &unit_id, &config.topics, tracker)?;

    // ── 5. Unit service ───────────────────────────────────────
    let service = UnitService::new(
        config.identity.clone(),
        config.topics.clone(),
        Duration::from_secs(u64::from(config.status_interval_secs)),
        vec![sensor.into(), relay.into()],
        &QUEUES,
        connectivity,
    )?;

    // ── 6. Executor ───────────────────────────────────────────
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    executor.spawn(service.run()).detach();
    executor.spawn(async move { bridge.run().await }).detach();

    info!("GrowUnit {} running", unit_id);

    // Timer wakes arrive from sleeper threads (see `link_shims`); the
    // executor drives the spawned tasks here.
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(())
}
