//! Commands sent to the receiver.

use crate::{error::Error, AsBytes, RefreshKind};

/// The report id used to ask the receiver to resend a report.
pub(crate) const STATUS_REQUEST_ID: u8 = 0xc9;

/// The report id used to play an alert on the headset.
pub(crate) const ALERT_REQUEST_ID: u8 = 0xca;

/// The feature report id used to set the sidetone.
pub(crate) const SIDETONE_REQUEST_ID: u8 = 0xff;

/// The highest sidetone level the headset accepts.
pub const SIDETONE_MAX: u8 = 55;

/// Asks the receiver to resend a report.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatusRequest {
    /// What should be refreshed.
    pub(crate) kind: RefreshKind,
}

impl AsBytes for StatusRequest {
    fn as_bytes(&self) -> Vec<u8> {
        vec![STATUS_REQUEST_ID, self.kind.report_id()]
    }
}

/// Plays one of the built-in alert tones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Alert {
    /// The alert to play.
    id: u8,
}

impl Alert {
    /// Validates the alert id.
    pub(crate) fn new(id: u8) -> Result<Self, Error> {
        match id {
            0 | 1 => Ok(Self { id }),
            _ => Err(Error::InvalidAlert(id)),
        }
    }
}

impl AsBytes for Alert {
    fn as_bytes(&self) -> Vec<u8> {
        vec![ALERT_REQUEST_ID, 0x02, self.id]
    }
}

/// Sets how much of the microphone is played back on the headset.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sidetone {
    /// The level between 0 and `SIDETONE_MAX`.
    level: u8,
}

impl Sidetone {
    /// Validates the sidetone level.
    pub(crate) fn new(level: u8) -> Result<Self, Error> {
        if level > SIDETONE_MAX {
            return Err(Error::InvalidSidetone(level));
        }

        Ok(Self { level })
    }
}

impl AsBytes for Sidetone {
    fn as_bytes(&self) -> Vec<u8> {
        let mut data = vec![0; 64];
        data[..11].copy_from_slice(&[
            SIDETONE_REQUEST_ID,
            0x0b,
            0x00,
            0xff,
            0x04,
            0x0e,
            0xff,
            0x05,
            0x01,
            0x04,
            0x00,
        ]);
        data[11] = self.level + 200;

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_requests() {
        let battery = StatusRequest {
            kind: RefreshKind::Battery,
        };
        let firmware = StatusRequest {
            kind: RefreshKind::Firmware,
        };

        assert_eq!(battery.as_bytes(), [0xc9, 0x64]);
        assert_eq!(firmware.as_bytes(), [0xc9, 0x66]);
    }

    #[test]
    fn alert_ids() {
        assert_eq!(Alert::new(0).unwrap().as_bytes(), [0xca, 0x02, 0x00]);
        assert_eq!(Alert::new(1).unwrap().as_bytes(), [0xca, 0x02, 0x01]);
        assert!(matches!(Alert::new(2), Err(Error::InvalidAlert(2))));
    }

    #[test]
    fn sidetone_levels() {
        let bytes = Sidetone::new(55).unwrap().as_bytes();

        assert_eq!(bytes.len(), 64);
        assert_eq!(
            bytes[..12],
            [0xff, 0x0b, 0x00, 0xff, 0x04, 0x0e, 0xff, 0x05, 0x01, 0x04, 0x00, 255]
        );
        assert!(bytes[12..].iter().all(|&b| b == 0));

        assert_eq!(Sidetone::new(0).unwrap().as_bytes()[11], 200);
        assert!(matches!(Sidetone::new(56), Err(Error::InvalidSidetone(56))));
        assert!(Sidetone::new(u8::MAX).is_err());
    }
}
