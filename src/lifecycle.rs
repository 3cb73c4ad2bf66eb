//! Creation and destruction of the power supply that exposes the headset battery.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    battery::{BatteryData, BatteryStatus, CapacityLevel},
    lock,
    state::DeviceState,
};

/// The registry power supplies are published to.
///
/// Implementations may block, they are only called from background work.
pub trait PowerSupply: Send + Sync + 'static {
    /// Identifies a registered power supply.
    type Handle: Send + 'static;

    /// Registers a new power supply.
    fn register(&self, descriptor: &PowerSupplyDescriptor) -> anyhow::Result<Self::Handle>;

    /// Removes a previously registered power supply.
    fn unregister(&self, handle: Self::Handle);

    /// Tells the registry that the properties of the power supply changed.
    fn changed(&self, handle: &Self::Handle);
}

/// What the power supply powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Not known.
    Unknown,
    /// Powers the whole system.
    System,
    /// Powers a single device.
    Device,
}

/// Read access to the live battery data.
#[derive(Clone)]
pub struct BatteryProperties {
    /// The state shared with the headset.
    state: Arc<Mutex<DeviceState>>,
}

impl fmt::Debug for BatteryProperties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("BatteryProperties")
            .field(&self.battery())
            .finish()
    }
}

impl BatteryProperties {
    pub(crate) fn new(state: Arc<Mutex<DeviceState>>) -> Self {
        Self { state }
    }

    /// A consistent snapshot of all battery properties.
    pub fn battery(&self) -> BatteryData {
        lock(&self.state).battery
    }

    /// The charging status.
    pub fn status(&self) -> BatteryStatus {
        self.battery().status
    }

    /// Whether the battery is present.
    pub fn present(&self) -> bool {
        self.battery().present
    }

    /// The charge in percent.
    pub fn capacity(&self) -> u8 {
        self.battery().capacity
    }

    /// The coarse charge level.
    pub fn capacity_level(&self) -> CapacityLevel {
        self.battery().capacity_level
    }
}

/// Everything needed to register the power supply.
#[derive(Debug, Clone)]
pub struct PowerSupplyDescriptor {
    /// The unique name of the power supply.
    pub name: String,
    /// What the power supply powers.
    pub scope: Scope,
    /// The model of the headset.
    pub model_name: String,
    /// The manufacturer of the headset.
    pub manufacturer: String,
    /// The live battery properties.
    pub properties: BatteryProperties,
}

/// A requested change of the power supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Register the power supply if it doesn't exist.
    Create,
    /// Unregister the power supply if it exists.
    Destroy,
}

/// Owns the power supply handle and applies create and destroy requests one at a time.
pub(crate) struct Lifecycle<P: PowerSupply> {
    /// The registry.
    supply: P,
    /// Describes the power supply to register.
    descriptor: PowerSupplyDescriptor,
    /// Requests that were not applied yet.
    pending: Mutex<VecDeque<Action>>,
    /// The registered power supply, held while an action runs.
    handle: Mutex<Option<P::Handle>>,
}

impl<P: PowerSupply> fmt::Debug for Lifecycle<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("descriptor", &self.descriptor.name)
            .field("pending", &*lock(&self.pending))
            .finish_non_exhaustive()
    }
}

impl<P: PowerSupply> Lifecycle<P> {
    pub(crate) fn new(supply: P, descriptor: PowerSupplyDescriptor) -> Self {
        Self {
            supply,
            descriptor,
            pending: Mutex::new(VecDeque::new()),
            handle: Mutex::new(None),
        }
    }

    /// Requests the power supply to be registered; `run_pending` applies it.
    pub(crate) fn request_create(&self) {
        lock(&self.pending).push_back(Action::Create);
    }

    /// Requests the power supply to be unregistered; `run_pending` applies it.
    ///
    /// A create that has not started yet is dropped.
    pub(crate) fn request_destroy(&self) {
        let mut pending = lock(&self.pending);

        if pending.back() == Some(&Action::Create) {
            log::debug!("dropping pending power supply creation");
            pending.pop_back();
        }

        pending.push_back(Action::Destroy);
    }

    /// Applies all pending requests in order.
    pub(crate) fn run_pending(&self) {
        let mut handle = lock(&self.handle);

        loop {
            let next = lock(&self.pending).pop_front();

            match next {
                Some(Action::Create) => self.create(&mut handle),
                Some(Action::Destroy) => self.destroy(&mut handle),
                None => break,
            }
        }
    }

    /// Tells the registry that the battery changed, if the power supply exists.
    pub(crate) fn notify_changed(&self) {
        if let Some(handle) = lock(&self.handle).as_ref() {
            self.supply.changed(handle);
        }
    }

    /// Whether the power supply is currently registered.
    pub(crate) fn is_registered(&self) -> bool {
        lock(&self.handle).is_some()
    }

    /// Drops all pending requests and unregisters the power supply.
    pub(crate) fn teardown(&self) {
        lock(&self.pending).clear();
        self.destroy(&mut lock(&self.handle));
    }

    fn create(&self, handle: &mut Option<P::Handle>) {
        if handle.is_some() {
            log::debug!("power supply {} already exists", self.descriptor.name);
            return;
        }

        match self.supply.register(&self.descriptor) {
            Ok(new) => {
                log::debug!("registered power supply {}", self.descriptor.name);
                *handle = Some(new);
            }
            Err(err) => log::error!(
                "failed to register power supply {}: {err}",
                self.descriptor.name
            ),
        }
    }

    fn destroy(&self, handle: &mut Option<P::Handle>) {
        if let Some(old) = handle.take() {
            self.supply.unregister(old);
            log::debug!("unregistered power supply {}", self.descriptor.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        registered: AtomicUsize,
        unregistered: AtomicUsize,
        fail: AtomicBool,
    }

    impl PowerSupply for Arc<Counting> {
        type Handle = usize;

        fn register(&self, _: &PowerSupplyDescriptor) -> anyhow::Result<usize> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("registry unavailable");
            }

            Ok(self.registered.fetch_add(1, Ordering::SeqCst))
        }

        fn unregister(&self, _: usize) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }

        fn changed(&self, _: &usize) {}
    }

    fn lifecycle() -> (Arc<Counting>, Lifecycle<Arc<Counting>>) {
        let counting = Arc::new(Counting::default());
        let descriptor = PowerSupplyDescriptor {
            name: "test-battery".into(),
            scope: Scope::Device,
            model_name: "Void".into(),
            manufacturer: "Corsair".into(),
            properties: BatteryProperties::new(Default::default()),
        };

        (Arc::clone(&counting), Lifecycle::new(counting, descriptor))
    }

    #[test]
    fn create_is_idempotent() {
        let (counting, lifecycle) = lifecycle();

        lifecycle.request_create();
        lifecycle.request_create();
        lifecycle.run_pending();

        assert!(lifecycle.is_registered());
        assert_eq!(counting.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_drops_pending_create() {
        let (counting, lifecycle) = lifecycle();

        lifecycle.request_create();
        lifecycle.request_destroy();
        lifecycle.run_pending();

        assert!(!lifecycle.is_registered());
        assert_eq!(counting.registered.load(Ordering::SeqCst), 0);
        assert_eq!(counting.unregistered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reconnect_replaces_handle() {
        let (counting, lifecycle) = lifecycle();

        lifecycle.request_create();
        lifecycle.run_pending();
        lifecycle.request_destroy();
        lifecycle.request_create();
        lifecycle.run_pending();

        assert!(lifecycle.is_registered());
        assert_eq!(counting.registered.load(Ordering::SeqCst), 2);
        assert_eq!(counting.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_registration_is_retried_on_next_create() {
        let (counting, lifecycle) = lifecycle();

        counting.fail.store(true, Ordering::SeqCst);
        lifecycle.request_create();
        lifecycle.run_pending();
        assert!(!lifecycle.is_registered());

        counting.fail.store(false, Ordering::SeqCst);
        lifecycle.request_create();
        lifecycle.run_pending();
        assert!(lifecycle.is_registered());
    }

    #[test]
    fn teardown_unregisters() {
        let (counting, lifecycle) = lifecycle();

        lifecycle.request_create();
        lifecycle.run_pending();
        lifecycle.request_create();
        lifecycle.teardown();
        lifecycle.run_pending();

        assert!(!lifecycle.is_registered());
        assert_eq!(counting.unregistered.load(Ordering::SeqCst), 1);
    }
}
