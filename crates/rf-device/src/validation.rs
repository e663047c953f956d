//! Parameter validation
//!
//! Pure checks against a device's specs. All bounds are inclusive and NaN is
//! never valid.

use rf_protocol::VALID_ANTENNAS;

use crate::device::DeviceSpecs;

/// Check that `hz` lies within the device's tuning range
pub fn validate_frequency(specs: &DeviceSpecs, hz: f64) -> bool {
    specs.min_frequency <= hz && hz <= specs.max_frequency
}

/// Check that `db` lies within the device's gain range
pub fn validate_gain(specs: &DeviceSpecs, db: f64) -> bool {
    specs.min_gain <= db && db <= specs.max_gain
}

/// Check that `name` is a supported antenna port
pub fn validate_antenna(name: &str) -> bool {
    VALID_ANTENNAS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn specs() -> DeviceSpecs {
        DeviceSpecs::usrp_b200("SN123456")
    }

    #[test]
    fn test_frequency_bounds_inclusive() {
        let specs = specs();
        assert!(validate_frequency(&specs, 70e6));
        assert!(validate_frequency(&specs, 6e9));
        assert!(validate_frequency(&specs, 2.4e9));
        assert!(!validate_frequency(&specs, 69_999_999.0));
        assert!(!validate_frequency(&specs, 10e9));
        assert!(!validate_frequency(&specs, 0.0));
        assert!(!validate_frequency(&specs, f64::NAN));
    }

    #[test]
    fn test_gain_bounds_inclusive() {
        let specs = specs();
        assert!(validate_gain(&specs, -20.0));
        assert!(validate_gain(&specs, 76.0));
        assert!(validate_gain(&specs, 0.0));
        assert!(!validate_gain(&specs, -20.5));
        assert!(!validate_gain(&specs, 76.1));
        assert!(!validate_gain(&specs, f64::NAN));
    }

    #[test]
    fn test_antennas() {
        assert!(validate_antenna("TX/RX"));
        assert!(validate_antenna("RX2"));
        assert!(!validate_antenna("rx2"));
        assert!(!validate_antenna(""));
        assert!(!validate_antenna("RX1"));
    }

    proptest! {
        #[test]
        fn frequency_valid_iff_in_range(hz in -1e10f64..2e10f64) {
            let specs = specs();
            let in_range = (70e6..=6e9).contains(&hz);
            prop_assert_eq!(validate_frequency(&specs, hz), in_range);
        }

        #[test]
        fn gain_valid_iff_in_range(db in -100f64..200f64) {
            let specs = specs();
            prop_assert_eq!(validate_gain(&specs, db), (-20.0..=76.0).contains(&db));
        }
    }
}
