//! Decoding of the status reports of Corsair Void wireless receivers.
//!
//! A [`Headset`] is attached to one receiver. Every report read from the receiver is handed to
//! [`Headset::deliver_report`], which keeps track of the battery, the connection and the firmware
//! of the headset and registers a power supply while the headset is connected.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]

mod battery;
mod commands;
pub mod config;
mod device;
mod error;
mod lifecycle;
mod poller;
mod power_state;
mod report;
mod state;
mod work;

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use commands::{Alert, Sidetone, ALERT_REQUEST_ID, SIDETONE_REQUEST_ID};
use config::Config;
use poller::Poller;
use work::WorkQueue;

pub use crate::{
    battery::{BatteryData, BatteryStatus, CapacityLevel},
    commands::SIDETONE_MAX,
    device::{HidTransport, Transport, CORSAIR_VENDOR_ID, KNOWN_RECEIVERS},
    error::{Error, TransportError},
    lifecycle::{BatteryProperties, PowerSupply, PowerSupplyDescriptor, Scope},
    poller::RefreshKind,
    power_state::PowerState,
    report::{decode, Event, BATTERY_REPORT_ID, FIRMWARE_REPORT_ID},
    state::{transition, ConnectionState, DeviceState, Effect, FirmwareInfo},
};

/// Convert a struct that implements this trait to bytes
trait AsBytes {
    /// Convert a struct that implements this trait to bytes
    fn as_bytes(&self) -> Vec<u8>;
}

/// Locks the mutex, ignoring poisoning.
///
/// The guarded data is plain state that stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The parts of the headset that background work needs access to.
struct Shared<T: Transport, P: PowerSupply> {
    /// Where commands are sent.
    transport: Arc<T>,
    /// The current state, also read by the power supply.
    state: Arc<Mutex<DeviceState>>,
    /// Owns the power supply.
    lifecycle: lifecycle::Lifecycle<P>,
    /// The configuration the headset was attached with.
    config: Config,
}

/// Represents a receiver and the headset connected to it.
///
/// Dropping the headset cancels all background work and unregisters the power supply.
pub struct Headset<T: Transport, P: PowerSupply> {
    /// The state shared with background work.
    shared: Arc<Shared<T, P>>,
    /// Schedules refresh requests.
    poller: Poller<T>,
    /// Runs everything that may block.
    queue: WorkQueue,
}

impl<T: Transport, P: PowerSupply> fmt::Debug for Headset<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Headset")
            .field("state", &self.state())
            .field("lifecycle", &self.shared.lifecycle)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, P: PowerSupply> Headset<T, P> {
    /// Attaches to a receiver and requests its battery and firmware reports.
    pub fn attach(transport: T, power_supply: P, config: Config) -> anyhow::Result<Self> {
        let transport = Arc::new(transport);
        let state = Arc::new(Mutex::new(DeviceState::default()));

        let descriptor = PowerSupplyDescriptor {
            name: config.power_supply_name(),
            scope: Scope::Device,
            model_name: config.model_name.clone(),
            manufacturer: config.manufacturer.clone(),
            properties: BatteryProperties::new(Arc::clone(&state)),
        };

        let queue = WorkQueue::new(&format!("corsair-void-{}", config.instance_name))?;
        let poller = Poller::new(Arc::clone(&transport), config.firmware_poll_delay);

        log::debug!("attaching {}", descriptor.name);

        let shared = Arc::new(Shared {
            transport,
            state,
            lifecycle: lifecycle::Lifecycle::new(power_supply, descriptor),
            config,
        });

        poller.start(&queue);

        Ok(Self {
            shared,
            poller,
            queue,
        })
    }

    /// Handles a report read from the receiver.
    ///
    /// This never blocks on the transport or the power supply, that work runs in the background.
    pub fn deliver_report(&self, report_id: u16, data: &[u8]) {
        let Some(event) = report::decode(report_id, data) else {
            log::trace!("ignoring report {report_id:#04x}: {data:02x?}");
            return;
        };

        log::debug!("received {event:?}");

        // The lock is held while effects are queued, so they keep the order of the reports
        let mut state = lock(&self.shared.state);
        let (next, effects) = transition(&state, &event);
        *state = next;

        for effect in effects {
            self.dispatch(effect, &next);
        }
    }

    /// Queues the work for a side effect of a state transition.
    fn dispatch(&self, effect: Effect, state: &DeviceState) {
        match effect {
            Effect::NotifyChanged => {
                let shared = Arc::clone(&self.shared);
                let battery = state.battery;

                self.queue.queue(move || {
                    shared.lifecycle.notify_changed();
                    shared.config.call_battery_change_handler(battery);
                });
            }
            Effect::ConnectEdge => {
                self.shared.lifecycle.request_create();
                self.queue_lifecycle(PowerState::Connected);
            }
            Effect::DisconnectEdge => {
                self.shared.lifecycle.request_destroy();
                self.queue_lifecycle(PowerState::Disconnected);
            }
            Effect::UpdateFirmware => self.poller.schedule_firmware(&self.queue),
        }
    }

    /// Queues the pending lifecycle actions and the power state change handler.
    fn queue_lifecycle(&self, power_state: PowerState) {
        let shared = Arc::clone(&self.shared);

        self.queue.queue(move || {
            shared.lifecycle.run_pending();
            shared.config.call_power_state_change_handler(power_state);
        });
    }

    /// Asks the receiver to resend a report in the background.
    pub fn request_refresh(&self, kind: RefreshKind) {
        let transport = Arc::clone(&self.shared.transport);

        self.queue
            .queue(move || poller::request_refresh(&*transport, kind));
    }

    /// Waits until all background work queued so far has run.
    pub fn flush(&self) {
        self.queue.flush();
    }

    /// A consistent snapshot of the current state.
    pub fn state(&self) -> DeviceState {
        *lock(&self.shared.state)
    }

    /// The current battery data.
    pub fn battery(&self) -> BatteryData {
        self.state().battery
    }

    /// Read access to the battery, as seen by the power supply.
    pub fn battery_properties(&self) -> BatteryProperties {
        BatteryProperties::new(Arc::clone(&self.shared.state))
    }

    /// Returns `true` if a headset is connected to the receiver.
    pub fn is_connected(&self) -> bool {
        self.state().connection.connected
    }

    /// Returns `true` if the power supply is currently registered.
    pub fn has_power_supply(&self) -> bool {
        self.shared.lifecycle.is_registered()
    }

    /// Returns `true` if the microphone arm is flipped up.
    pub fn microphone_up(&self) -> Result<bool, Error> {
        let connection = self.state().connection;

        if !connection.connected {
            return Err(Error::NotAttached);
        }

        Ok(connection.mic_up)
    }

    /// The firmware version of the receiver, if it is known.
    pub fn firmware_version_receiver(&self) -> Option<(u8, u8)> {
        self.state().firmware.receiver()
    }

    /// The firmware version of the headset, if it is known.
    pub fn firmware_version_headset(&self) -> Option<(u8, u8)> {
        self.state().firmware.headset()
    }

    /// Plays alert `0` or `1` on the headset.
    pub fn send_alert(&self, id: u8) -> Result<(), Error> {
        let alert = Alert::new(id)?;
        self.ensure_connected()?;

        log::debug!("sending alert {id}");

        self.shared
            .transport
            .send(ALERT_REQUEST_ID, &alert.as_bytes())?;

        Ok(())
    }

    /// Sets the sidetone level, at most [`SIDETONE_MAX`].
    pub fn set_sidetone(&self, level: u8) -> Result<(), Error> {
        let sidetone = Sidetone::new(level)?;
        self.ensure_connected()?;

        log::debug!("setting sidetone to {level}");

        self.shared
            .transport
            .send_feature(SIDETONE_REQUEST_ID, &sidetone.as_bytes())?;

        Ok(())
    }

    /// Fails with `Error::NotAttached` if no headset is connected.
    fn ensure_connected(&self) -> Result<(), Error> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotAttached)
        }
    }
}

impl<T: Transport, P: PowerSupply> Drop for Headset<T, P> {
    fn drop(&mut self) {
        self.queue.shutdown();
        self.shared.lifecycle.teardown();

        log::debug!("detached {}", self.shared.config.power_supply_name());
    }
}
