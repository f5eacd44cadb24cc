//! Unit identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable ID of the form `GU-XXYYZZ` (last 3 MAC bytes in
//! uppercase hex).  It fills the `unitID` identity field when the stored
//! config does not set one, and doubles as the MQTT client id.

use core::fmt::Write;

use log::info;

use crate::config::{UnitIdentity, UNIT_ID_KEY};

/// "GU-XXYYZZ"
pub type UnitIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x24, 0x6F, 0x28, 0x0A, 0x0B, 0x0C]
}

pub fn unit_id(mac: &MacAddress) -> UnitIdString {
    let mut id = UnitIdString::new();
    let _ = write!(id, "GU-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Fill in `unitID` from the MAC unless the identity already carries one.
pub fn ensure_unit_id(identity: &mut UnitIdentity, mac: &MacAddress) {
    if identity.get(UNIT_ID_KEY).is_none() {
        let id = unit_id(mac);
        info!("Unit id derived from MAC: {}", id);
        identity.insert(UNIT_ID_KEY, &id);
    }
}
