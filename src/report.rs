//! Decoding of the reports sent by the receiver.

/// The id of the periodic battery and connection status report.
pub const BATTERY_REPORT_ID: u8 = 0x64;

/// The id of the firmware version report.
pub const FIRMWARE_REPORT_ID: u8 = 0x66;

/// The connection code that means the headset is attached and the link is healthy.
pub(crate) const CONNECTION_HEALTHY: u8 = 177;

/// A decoded report from the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Battery and connection status.
    Battery {
        /// Charge percentage, only meaningful while connected.
        capacity: u8,
        /// Whether the microphone arm is flipped up.
        mic_up: bool,
        /// Raw state of the wireless link.
        connection_code: u8,
        /// Raw battery state.
        battery_code: u8,
    },
    /// Firmware versions of the receiver and the headset.
    Firmware {
        /// Receiver major version.
        receiver_major: u8,
        /// Receiver minor version.
        receiver_minor: u8,
        /// Headset major version, 0 when no headset is attached.
        headset_major: u8,
        /// Headset minor version, 0 when no headset is attached.
        headset_minor: u8,
    },
}

/// Decodes a raw report into an event.
///
/// Unknown report ids and reports that are too short are ignored.
pub fn decode(report_id: u16, bytes: &[u8]) -> Option<Event> {
    match (report_id, bytes) {
        (id, [_, _, capacity, connection_code, battery_code, ..])
            if id == u16::from(BATTERY_REPORT_ID) =>
        {
            Some(Event::Battery {
                capacity: capacity & 0x7f,
                mic_up: capacity & 0x80 != 0,
                connection_code: *connection_code,
                battery_code: *battery_code,
            })
        }
        (id, [_, receiver_major, receiver_minor, headset_major, headset_minor, ..])
            if id == u16::from(FIRMWARE_REPORT_ID) =>
        {
            Some(Event::Firmware {
                receiver_major: *receiver_major,
                receiver_minor: *receiver_minor,
                headset_major: *headset_major,
                headset_minor: *headset_minor,
            })
        }
        _ => None,
    }
}

/// A human readable name for a connection code, for logging only.
///
/// Everything except 177 is treated as "not connected", these names are best guesses.
pub(crate) fn connection_code_name(code: u8) -> &'static str {
    match code {
        CONNECTION_HEALTHY => "connected",
        38 => "initializing",
        49 => "lost",
        51 | 52 => "searching",
        _ => "unknown",
    }
}
