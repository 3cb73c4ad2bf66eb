//! The transport to the receiver and its implementation on top of `hidapi`.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use hidapi::HidDevice;

use crate::{error::TransportError, lock};

/// The vendor id of Corsair.
pub const CORSAIR_VENDOR_ID: u16 = 0x1b1c;

/// Receivers known to speak this protocol, with their product names.
pub const KNOWN_RECEIVERS: &[(u16, &str)] = &[(0x0a14, "Corsair Void Pro Wireless")];

/// Sends reports to the receiver.
///
/// Reports read from the receiver are handed to `Headset::deliver_report` instead.
pub trait Transport: Send + Sync + 'static {
    /// Sends an output report. `data` starts with the report id.
    fn send(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Sends a feature report. `data` starts with the report id.
    fn send_feature(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        self.send(report_id, data)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(report_id, data)
    }

    fn send_feature(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).send_feature(report_id, data)
    }
}

/// Implements the communication with the hardware.
pub struct HidTransport {
    /// The raw inner `HidDevice` of this device.
    device: Mutex<HidDevice>,
    /// The product name of the receiver.
    model_name: String,
    /// The serial number, if the receiver reports one.
    serial_number: Option<String>,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HidTransport")
            .field("model_name", &self.model_name)
            .field("serial_number", &self.serial_number)
            .finish_non_exhaustive()
    }
}

impl HidTransport {
    /// Opens the first known receiver.
    pub fn open() -> anyhow::Result<Self> {
        let api = hidapi::HidApi::new()?;

        let (info, known_name) = api
            .device_list()
            .find_map(|info| {
                KNOWN_RECEIVERS
                    .iter()
                    .find(|(product_id, _)| {
                        info.vendor_id() == CORSAIR_VENDOR_ID && info.product_id() == *product_id
                    })
                    .map(|(_, name)| (info, *name))
            })
            .ok_or_else(|| anyhow::anyhow!("no supported receiver found"))?;

        log::debug!(
            "opening receiver {:04x}:{:04x} at {:?}",
            info.vendor_id(),
            info.product_id(),
            info.path()
        );

        let device = info.open_device(&api)?;
        let model_name = device
            .get_product_string()
            .ok()
            .flatten()
            .unwrap_or_else(|| known_name.to_owned());
        let serial_number = device.get_serial_number_string().ok().flatten();

        log::info!("opened receiver {model_name:?}");

        Ok(Self {
            device: Mutex::new(device),
            model_name,
            serial_number,
        })
    }

    /// The product name of the receiver.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The serial number of the receiver, if it has one.
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// Reads one input report, returning an empty buffer if the read timed out.
    pub fn read_report(&self, timeout: i32) -> anyhow::Result<Vec<u8>> {
        let mut buf = [0; 64];

        let len = lock(&self.device).read_timeout(&mut buf, timeout)?;
        let result = buf[..len].to_vec();

        if len != 0 {
            log::trace!("read {:02x?}", result);
        }

        Ok(result)
    }
}

impl Transport for HidTransport {
    fn send(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        log::trace!("writing {:02x?}", data);

        lock(&self.device)
            .write(data)
            .map(drop)
            .map_err(|err| TransportError::new(report_id, err))
    }

    fn send_feature(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        log::trace!("writing feature report {:02x?}", data);

        lock(&self.device)
            .send_feature_report(data)
            .map_err(|err| TransportError::new(report_id, err))
    }
}
