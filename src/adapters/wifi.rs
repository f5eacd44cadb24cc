//! WiFi station-mode adapter.
//!
//! Owns the station link and mirrors its state into the shared
//! [`ConnectivityState`] network flag, which gates every outbound send.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc::wifi`.
//! - **all other targets**: a simulated link for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) between retries.  A healthy link is re-checked
//! every [`HEALTH_CHECK_SECS`].  Supervision runs on its own thread
//! ([`WifiLink::spawn_supervisor`]).

use core::fmt;
use core::time::Duration;

use log::{error, info, warn};

use crate::connectivity::ConnectivityState;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    Driver,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::Driver => write!(f, "WiFi driver error"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Validated station credentials.  An empty password selects an open network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() {
            return Err(WifiError::NoCredentials);
        }
        if !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(WifiError::InvalidPassword);
        }
        Ok(Self {
            ssid: ssid.try_into().map_err(|_| WifiError::InvalidSsid)?,
            password: password.try_into().map_err(|_| WifiError::InvalidPassword)?,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }
}

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;
pub const HEALTH_CHECK_SECS: u32 = 5;
const SUPERVISOR_STACK_KB: usize = 8;

pub struct WifiLink {
    credentials: WifiCredentials,
    connectivity: ConnectivityState,
    state: WifiState,
    backoff_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: remaining connect attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    /// Simulation: whether the simulated AP still sees us.
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
}

impl WifiLink {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        credentials: WifiCredentials,
        connectivity: ConnectivityState,
    ) -> Result<Self, WifiError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
            error!("WiFi: driver init failed: {}", e);
            WifiError::Driver
        })?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(|e| {
            error!("WiFi: event loop wrap failed: {}", e);
            WifiError::Driver
        })?;
        Ok(Self {
            credentials,
            connectivity,
            state: WifiState::Disconnected,
            backoff_secs: INITIAL_BACKOFF_SECS,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(credentials: WifiCredentials, connectivity: ConnectivityState) -> Self {
        Self {
            credentials,
            connectivity,
            state: WifiState::Disconnected,
            backoff_secs: INITIAL_BACKOFF_SECS,
            sim_failures: 0,
            sim_associated: false,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Delay until the next [`poll`](Self::poll) should run.
    pub fn next_check(&self) -> Duration {
        let secs = match self.state {
            WifiState::Reconnecting { .. } => self.backoff_secs,
            _ => HEALTH_CHECK_SECS,
        };
        Duration::from_secs(u64::from(secs))
    }

    /// First connection attempt.  On failure the link enters the
    /// reconnect cycle driven by [`poll`](Self::poll).
    pub fn connect(&mut self) -> Result<(), WifiError> {
        info!("WiFi: connecting to '{}'", self.credentials.ssid());
        match self.platform_connect() {
            Ok(()) => {
                self.on_connected();
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    /// One supervision step: detect link loss, or retry a lost link.
    pub fn poll(&mut self) {
        match self.state {
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.connectivity.set_network_up(false);
                    self.state = WifiState::Reconnecting { attempt: 0 };
                }
            }
            WifiState::Reconnecting { attempt } => {
                info!(
                    "WiFi: reconnect attempt {} (backoff {}s)",
                    attempt, self.backoff_secs
                );
                match self.platform_connect() {
                    Ok(()) => self.on_connected(),
                    Err(_) => {
                        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                        self.state = WifiState::Reconnecting {
                            attempt: attempt + 1,
                        };
                    }
                }
            }
            WifiState::Disconnected => {}
        }
    }

    /// Keep the link up forever on a dedicated thread.
    ///
    /// A reconnect blocks in the driver until association and DHCP finish,
    /// so supervision stays off the executor thread that runs the unit
    /// loops and the MQTT publish task.
    pub fn spawn_supervisor(mut self) -> std::io::Result<std::thread::JoinHandle<()>> {
        info!("Spawning 'wifi-sup' (stack={}KB)", SUPERVISOR_STACK_KB);
        std::thread::Builder::new()
            .name("wifi-sup".into())
            .stack_size(SUPERVISOR_STACK_KB * 1024)
            .spawn(move || {
                loop {
                    std::thread::sleep(self.next_check());
                    self.poll();
                }
            })
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        self.connectivity.set_network_up(true);
        info!("WiFi: connected to '{}'", self.credentials.ssid());
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), WifiError> {
        let creds = &self.credentials;
        let auth_method = if creds.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| WifiError::Driver)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| WifiError::Driver)?;
        }
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: associate failed: {}", e);
            WifiError::ConnectionFailed
        })?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| WifiError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), WifiError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            warn!("WiFi(sim): simulated connect failure");
            return Err(WifiError::ConnectionFailed);
        }
        self.sim_associated = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_associated
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
