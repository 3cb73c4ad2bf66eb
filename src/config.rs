//! Respresents the configuration of a headset instance.

use std::{
    fmt,
    ops::Deref,
    time::Duration,
};

use crate::{BatteryData, PowerState};

/// A wrapper that simply hides its inner type in `Debug` implementations.
///
/// This is useful for types which do not implement `Debug`.
pub(crate) struct OpaqueDebug<T> {
    /// The wrapped value.
    inner: T,
}

impl<T> fmt::Debug for OpaqueDebug<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "..")
    }
}

impl<T> Deref for OpaqueDebug<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> From<T> for OpaqueDebug<T> {
    fn from(inner: T) -> Self {
        OpaqueDebug { inner }
    }
}

/// A handler for changes in the power state of the headset.
pub type PowerStateChangeHandler = Box<dyn Fn(PowerState) + Send + Sync>;

/// A handler for changes of the battery data.
pub type BatteryChangeHandler = Box<dyn Fn(BatteryData) + Send + Sync>;

/// The default pause between the battery and the firmware request.
pub const DEFAULT_FIRMWARE_POLL_DELAY: Duration = Duration::from_millis(100);

/// The configuration of a headset instance.
#[derive(Debug)]
pub struct Config {
    /// The pause before firmware versions are requested.
    pub(crate) firmware_poll_delay: Duration,
    /// Identifies the receiver in the power supply name.
    pub(crate) instance_name: String,
    /// The model name reported by the power supply.
    pub(crate) model_name: String,
    /// The manufacturer reported by the power supply.
    pub(crate) manufacturer: String,
    /// The handler for power state changes.
    pub(crate) power_state_change_handler: Option<OpaqueDebug<PowerStateChangeHandler>>,
    /// The handler for battery changes.
    pub(crate) battery_change_handler: Option<OpaqueDebug<BatteryChangeHandler>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firmware_poll_delay: DEFAULT_FIRMWARE_POLL_DELAY,
            instance_name: String::from("0"),
            model_name: String::from("Corsair Void"),
            manufacturer: String::from("Corsair"),
            power_state_change_handler: None,
            battery_change_handler: None,
        }
    }
}

impl Config {
    /// The name of the power supply registered for this instance.
    pub fn power_supply_name(&self) -> String {
        format!("corsair-void-{}-battery", self.instance_name)
    }

    /// Sets the pause between the battery and the firmware request.
    pub fn set_firmware_poll_delay(&mut self, delay: Duration) {
        self.firmware_poll_delay = delay;
    }

    /// Sets the name that distinguishes this receiver from others.
    pub fn set_instance_name(&mut self, name: impl Into<String>) {
        self.instance_name = name.into();
    }

    /// Sets the model name reported by the power supply.
    pub fn set_model_name(&mut self, name: impl Into<String>) {
        self.model_name = name.into();
    }

    /// Sets the manufacturer reported by the power supply.
    pub fn set_manufacturer(&mut self, manufacturer: impl Into<String>) {
        self.manufacturer = manufacturer.into();
    }

    /// Sets the handler for power state changes.
    ///
    /// The handler runs on the background worker of the headset.
    pub fn set_power_state_change_handler(&mut self, handler: Option<PowerStateChangeHandler>) {
        self.power_state_change_handler = handler.map(OpaqueDebug::from);
    }

    /// Sets the handler for battery changes.
    ///
    /// The handler runs on the background worker of the headset.
    pub fn set_battery_change_handler(&mut self, handler: Option<BatteryChangeHandler>) {
        self.battery_change_handler = handler.map(OpaqueDebug::from);
    }

    /// Calls the configured power state change handler, if it exists.
    pub(crate) fn call_power_state_change_handler(&self, power_state: PowerState) {
        if let Some(handler) = &self.power_state_change_handler {
            handler(power_state);
        }
    }

    /// Calls the configured battery change handler, if it exists.
    pub(crate) fn call_battery_change_handler(&self, battery: BatteryData) {
        if let Some(handler) = &self.battery_change_handler {
            handler(battery);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    #[test]
    fn power_supply_name_uses_instance() {
        let mut config = Config::default();
        config.set_instance_name("0003:1B1C:0A14.0007");

        assert_eq!(
            config.power_supply_name(),
            "corsair-void-0003:1B1C:0A14.0007-battery"
        );
    }

    #[test]
    fn calls_handlers() {
        let mut config = Config::default();
        let called = Arc::new(AtomicBool::new(false));

        config.call_power_state_change_handler(PowerState::Connected);

        config.set_power_state_change_handler(Some(Box::new({
            let called = Arc::clone(&called);
            move |state| called.store(state == PowerState::Connected, Ordering::SeqCst)
        })));
        config.call_power_state_change_handler(PowerState::Connected);

        assert!(called.load(Ordering::SeqCst));
        assert!(format!("{config:?}").contains(".."));
    }
}
