//! Battery and charging status related things.

use std::fmt;

/// The battery code reported by the receiver.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(crate) enum BatteryCode {
    /// No battery information is available, usually because nothing is connected.
    Unavailable,
    /// Discharging at a normal level.
    Normal,
    /// Discharging at a low level.
    Low,
    /// Discharging at a critical level.
    Critical,
    /// The battery is fully charged.
    Full,
    /// The battery is charging.
    Charging,
    /// A code that is not understood.
    Unknown(u8),
}

impl From<u8> for BatteryCode {
    fn from(code: u8) -> Self {
        match code {
            0 => BatteryCode::Unavailable,
            1 => BatteryCode::Normal,
            2 => BatteryCode::Low,
            3 => BatteryCode::Critical,
            4 => BatteryCode::Full,
            5 => BatteryCode::Charging,
            other => BatteryCode::Unknown(other),
        }
    }
}

/// The current status of charging
#[derive(Debug, Eq, Hash, PartialEq, Copy, Clone, Default)]
pub enum BatteryStatus {
    /// The status is not known
    #[default]
    Unknown,
    /// Battery is discharging
    Discharging,
    /// Battery is charging
    Charging,
    /// Battery is full
    Full,
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatteryStatus::Unknown => write!(f, "unknown"),
            BatteryStatus::Discharging => write!(f, "discharging"),
            BatteryStatus::Charging => write!(f, "charging"),
            BatteryStatus::Full => write!(f, "full"),
        }
    }
}

/// A coarse description of the remaining charge
#[derive(Debug, Eq, Hash, PartialEq, Copy, Clone, Default)]
pub enum CapacityLevel {
    /// The level is not known
    #[default]
    Unknown,
    /// Battery is almost empty
    Critical,
    /// Battery is low
    Low,
    /// Battery is fine
    Normal,
}

impl fmt::Display for CapacityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CapacityLevel::Unknown => write!(f, "unknown"),
            CapacityLevel::Critical => write!(f, "critical"),
            CapacityLevel::Low => write!(f, "low"),
            CapacityLevel::Normal => write!(f, "normal"),
        }
    }
}

/// Battery data of the headset.
///
/// When `present` is `false` the remaining fields always hold their unknown values.
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct BatteryData {
    /// Charging status
    pub status: BatteryStatus,
    /// Whether a battery is reported at all
    pub present: bool,
    /// Charge percentage
    pub capacity: u8,
    /// Coarse charge level
    pub capacity_level: CapacityLevel,
}

impl BatteryData {
    /// Battery data when nothing is known about the battery.
    pub const UNKNOWN: BatteryData = BatteryData {
        status: BatteryStatus::Unknown,
        present: false,
        capacity: 0,
        capacity_level: CapacityLevel::Unknown,
    };

    /// Derives the battery data from the capacity and battery code of a report.
    ///
    /// Returns the unknown value for codes that don't describe a battery.
    pub(crate) fn from_code(capacity: u8, code: BatteryCode) -> Self {
        let (status, capacity_level) = match code {
            BatteryCode::Normal => (BatteryStatus::Discharging, CapacityLevel::Normal),
            BatteryCode::Low => (BatteryStatus::Discharging, CapacityLevel::Low),
            BatteryCode::Critical => (BatteryStatus::Discharging, CapacityLevel::Critical),
            BatteryCode::Full => (BatteryStatus::Full, CapacityLevel::Normal),
            BatteryCode::Charging => (BatteryStatus::Charging, CapacityLevel::Normal),
            BatteryCode::Unavailable | BatteryCode::Unknown(_) => return Self::UNKNOWN,
        };

        BatteryData {
            status,
            present: true,
            capacity,
            capacity_level,
        }
    }
}

impl fmt::Display for BatteryData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.present {
            write!(
                f,
                "{} {}% ({})",
                self.status, self.capacity, self.capacity_level
            )
        } else {
            write!(f, "not present")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_status_and_level() {
        let low = BatteryData::from_code(15, BatteryCode::from(2));
        assert_eq!(low.status, BatteryStatus::Discharging);
        assert_eq!(low.capacity_level, CapacityLevel::Low);
        assert_eq!(low.capacity, 15);
        assert!(low.present);

        let critical = BatteryData::from_code(3, BatteryCode::from(3));
        assert_eq!(critical.capacity_level, CapacityLevel::Critical);

        let full = BatteryData::from_code(100, BatteryCode::from(4));
        assert_eq!(full.status, BatteryStatus::Full);
    }

    #[test]
    fn unavailable_and_unknown_codes_are_absent() {
        assert_eq!(BatteryData::from_code(50, BatteryCode::from(0)), BatteryData::UNKNOWN);
        assert_eq!(BatteryCode::from(9), BatteryCode::Unknown(9));
        assert_eq!(BatteryData::from_code(50, BatteryCode::from(9)), BatteryData::UNKNOWN);
        assert_eq!(BatteryData::default(), BatteryData::UNKNOWN);
    }
}
