//! Network link status adapter.
//!
//! Link bring-up (driver init, DHCP, static addressing) happens outside
//! this core; its event handlers feed this adapter, and the core only ever
//! reads it through [`NetLinkPort`].

use heapless::String;

use crate::app::ports::NetLinkPort;
use crate::config::bounded;

#[derive(Debug, Default)]
pub struct LinkStatus {
    wifi_up: bool,
    eth_up: bool,
    ip: String<16>,
    rssi: Option<i8>,
}

impl LinkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_wifi(&mut self, up: bool, ip: &str, rssi: Option<i8>) {
        self.wifi_up = up;
        self.ip = bounded(if up { ip } else { "" });
        self.rssi = if up { rssi } else { None };
    }

    pub fn set_eth(&mut self, up: bool, ip: &str) {
        self.eth_up = up;
        if up {
            self.ip = bounded(ip);
        }
    }
}

impl NetLinkPort for LinkStatus {
    fn wifi_connected(&self) -> bool {
        self.wifi_up
    }

    fn eth_connected(&self) -> bool {
        self.eth_up
    }

    fn ip_address(&self) -> String<16> {
        self.ip.clone()
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }
}
