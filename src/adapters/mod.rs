//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements / drives   | Connects to                |
//! |-------------|-----------------------|----------------------------|
//! | `nvs`       | ConfigPort            | NVS / in-memory store      |
//! |             | StoragePort           |                            |
//! | `device_id` | unit identity         | eFuse factory MAC          |
//! | `wifi`      | network flag          | ESP-IDF WiFi STA           |
//! | `mqtt`      | session flag, queues  | ESP-IDF MQTT client        |

pub mod device_id;
pub mod mqtt;
pub mod nvs;
pub mod wifi;
