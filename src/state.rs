//! The device state and the transitions driven by decoded reports.

use crate::{
    battery::{BatteryCode, BatteryData},
    report::{connection_code_name, Event, CONNECTION_HEALTHY},
};

/// Whether a headset is attached to the receiver.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct ConnectionState {
    /// Whether the headset is connected.
    pub connected: bool,
    /// Whether the microphone arm is flipped up.
    pub mic_up: bool,
}

/// Firmware versions of the receiver and the headset.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct FirmwareInfo {
    /// Receiver major version.
    pub receiver_major: u8,
    /// Receiver minor version.
    pub receiver_minor: u8,
    /// Headset major version, zero while disconnected.
    pub headset_major: u8,
    /// Headset minor version, zero while disconnected.
    pub headset_minor: u8,
}

impl FirmwareInfo {
    /// The receiver version, if it was reported.
    pub fn receiver(&self) -> Option<(u8, u8)> {
        version(self.receiver_major, self.receiver_minor)
    }

    /// The headset version, if it was reported.
    pub fn headset(&self) -> Option<(u8, u8)> {
        version(self.headset_major, self.headset_minor)
    }
}

fn version(major: u8, minor: u8) -> Option<(u8, u8)> {
    if (major, minor) == (0, 0) {
        None
    } else {
        Some((major, minor))
    }
}

/// Everything known about the receiver and the headset.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct DeviceState {
    /// Battery data of the headset.
    pub battery: BatteryData,
    /// Connection of the headset.
    pub connection: ConnectionState,
    /// Firmware versions.
    pub firmware: FirmwareInfo,
}

/// Side effects requested by a state transition.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Effect {
    /// The battery data changed.
    NotifyChanged,
    /// The headset was just connected.
    ConnectEdge,
    /// The headset was just disconnected.
    DisconnectEdge,
    /// The firmware versions should be requested again.
    UpdateFirmware,
}

/// Applies an event to the state, returning the new state and the requested side effects.
pub fn transition(state: &DeviceState, event: &Event) -> (DeviceState, Vec<Effect>) {
    let mut next = *state;
    let mut effects = Vec::new();

    match *event {
        Event::Battery {
            capacity,
            mic_up,
            connection_code,
            battery_code,
        } => {
            let connected = connection_code == CONNECTION_HEALTHY;
            let code = BatteryCode::from(battery_code);

            if let BatteryCode::Unknown(code) = code {
                log::warn!("unknown battery code {code}, treating the battery as unavailable");
            }

            next.battery = if connected {
                BatteryData::from_code(capacity, code)
            } else {
                BatteryData::UNKNOWN
            };
            next.connection.mic_up = mic_up;

            if next.battery != state.battery {
                effects.push(Effect::NotifyChanged);
            }

            match (state.connection.connected, connected) {
                (false, true) => {
                    log::info!("headset connected");

                    next.connection.connected = true;
                    effects.push(Effect::ConnectEdge);
                    effects.push(Effect::UpdateFirmware);
                }
                (true, false) => {
                    log::info!(
                        "headset disconnected: {} ({connection_code})",
                        connection_code_name(connection_code)
                    );

                    next.connection.connected = false;
                    next.connection.mic_up = false;
                    next.firmware.headset_major = 0;
                    next.firmware.headset_minor = 0;
                    effects.push(Effect::DisconnectEdge);
                }
                _ => (),
            }
        }
        Event::Firmware {
            receiver_major,
            receiver_minor,
            headset_major,
            headset_minor,
        } => {
            next.firmware = FirmwareInfo {
                receiver_major,
                receiver_minor,
                headset_major,
                headset_minor,
            };
        }
    }

    (next, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryStatus, CapacityLevel};

    fn battery(capacity: u8, mic_up: bool, connection_code: u8, battery_code: u8) -> Event {
        Event::Battery {
            capacity,
            mic_up,
            connection_code,
            battery_code,
        }
    }

    fn connected() -> DeviceState {
        transition(&DeviceState::default(), &battery(50, true, 177, 1)).0
    }

    #[test]
    fn non_healthy_codes_leave_battery_unknown() {
        for connection_code in (0..=u8::MAX).filter(|&code| code != 177) {
            for battery_code in [0, 1, 4, 5, 9] {
                let (next, _) = transition(
                    &DeviceState::default(),
                    &battery(80, false, connection_code, battery_code),
                );

                assert_eq!(next.battery, BatteryData::UNKNOWN);
                assert!(!next.connection.connected);
            }
        }
    }

    #[test]
    fn charging_report_sets_battery() {
        let (next, effects) = transition(&DeviceState::default(), &battery(22, false, 177, 5));

        assert_eq!(
            next.battery,
            BatteryData {
                status: BatteryStatus::Charging,
                present: true,
                capacity: 22,
                capacity_level: CapacityLevel::Normal,
            }
        );
        assert!(!next.connection.mic_up);
        assert_eq!(
            effects,
            [
                Effect::NotifyChanged,
                Effect::ConnectEdge,
                Effect::UpdateFirmware
            ]
        );
    }

    #[test]
    fn unknown_battery_code_while_connected_is_unavailable() {
        let (next, effects) = transition(&DeviceState::default(), &battery(22, false, 177, 7));

        assert_eq!(next.battery, BatteryData::UNKNOWN);
        assert!(next.connection.connected);
        assert_eq!(effects, [Effect::ConnectEdge, Effect::UpdateFirmware]);
    }

    #[test]
    fn unknown_battery_code_while_disconnected_is_unavailable() {
        let (next, effects) = transition(&DeviceState::default(), &battery(22, true, 51, 9));

        assert_eq!(next.battery, BatteryData::UNKNOWN);
        assert!(!next.connection.connected);
        assert!(effects.is_empty());
    }

    #[test]
    fn connect_edge_is_emitted_once() {
        let state = connected();
        let (_, effects) = transition(&state, &battery(50, true, 177, 1));

        assert!(effects.is_empty());

        let (_, effects) = transition(&state, &battery(49, true, 177, 1));
        assert_eq!(effects, [Effect::NotifyChanged]);
    }

    #[test]
    fn disconnect_clears_mic_and_headset_firmware() {
        let (state, _) = transition(
            &connected(),
            &Event::Firmware {
                receiver_major: 2,
                receiver_minor: 1,
                headset_major: 3,
                headset_minor: 4,
            },
        );
        assert_eq!(state.firmware.headset(), Some((3, 4)));

        let (next, effects) = transition(&state, &battery(0, true, 49, 0));

        assert!(!next.connection.connected);
        assert!(!next.connection.mic_up);
        assert_eq!(next.firmware.headset(), None);
        assert_eq!(next.firmware.receiver(), Some((2, 1)));
        assert_eq!(effects, [Effect::NotifyChanged, Effect::DisconnectEdge]);
    }

    #[test]
    fn mic_follows_report_while_disconnected() {
        let (next, effects) = transition(&DeviceState::default(), &battery(0, true, 51, 0));

        assert!(next.connection.mic_up);
        assert!(effects.is_empty());
    }

    #[test]
    fn firmware_report_does_not_notify() {
        let (next, effects) = transition(
            &DeviceState::default(),
            &Event::Firmware {
                receiver_major: 1,
                receiver_minor: 9,
                headset_major: 0,
                headset_minor: 0,
            },
        );

        assert!(effects.is_empty());
        assert_eq!(next.firmware.receiver(), Some((1, 9)));
        assert_eq!(next.firmware.headset(), None);
    }
}
