//! Asks the receiver to resend its reports.

use std::{sync::Arc, time::Duration};

use crate::{
    commands::{StatusRequest, STATUS_REQUEST_ID},
    device::Transport,
    report::{BATTERY_REPORT_ID, FIRMWARE_REPORT_ID},
    work::WorkQueue,
    AsBytes,
};

/// A report that can be requested from the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// The battery and connection status report.
    Battery,
    /// The firmware version report.
    Firmware,
}

impl RefreshKind {
    /// The id of the report that gets resent.
    pub(crate) fn report_id(self) -> u8 {
        match self {
            RefreshKind::Battery => BATTERY_REPORT_ID,
            RefreshKind::Firmware => FIRMWARE_REPORT_ID,
        }
    }
}

/// Schedules refresh requests on the work queue.
#[derive(Debug)]
pub(crate) struct Poller<T: Transport> {
    /// Where the requests are sent.
    transport: Arc<T>,
    /// The pause between the battery and the firmware request.
    ///
    /// The receiver drops one of the answers if both are requested back to back.
    firmware_delay: Duration,
}

impl<T: Transport> Poller<T> {
    pub(crate) fn new(transport: Arc<T>, firmware_delay: Duration) -> Self {
        Self {
            transport,
            firmware_delay,
        }
    }

    /// Schedules the initial battery and firmware requests.
    pub(crate) fn start(&self, queue: &WorkQueue) {
        self.schedule(queue, RefreshKind::Battery, Duration::ZERO);
        self.schedule_firmware(queue);
    }

    /// Schedules a firmware request after the firmware delay.
    pub(crate) fn schedule_firmware(&self, queue: &WorkQueue) {
        self.schedule(queue, RefreshKind::Firmware, self.firmware_delay);
    }

    fn schedule(&self, queue: &WorkQueue, kind: RefreshKind, delay: Duration) {
        let transport = Arc::clone(&self.transport);

        queue.queue_delayed(delay, move || request_refresh(&*transport, kind));
    }
}

/// Asks the receiver to resend a report, logging failures.
///
/// Failed requests are not retried, the next scheduled request tries again.
pub(crate) fn request_refresh<T: Transport + ?Sized>(transport: &T, kind: RefreshKind) {
    log::debug!("requesting {kind:?} report");

    if let Err(err) = transport.send(STATUS_REQUEST_ID, &StatusRequest { kind }.as_bytes()) {
        log::warn!("failed to request {kind:?} report: {err}");
    }
}
