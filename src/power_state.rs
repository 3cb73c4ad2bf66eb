//! Code for interacting with the power state of the device.

/// Represents the current power state of the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// The headset is currently connected to the receiver.
    Connected,
    /// The headset is turned off or out of range.
    Disconnected,
}
