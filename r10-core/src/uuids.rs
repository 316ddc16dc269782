//! GATT UUID table (spec.md §6). The R10 uses Garmin's base UUID
//! `-667b-11e3-949a-0800200c9a66` for its vendor-specific services.

use once_cell::sync::Lazy;
use uuid::Uuid;

macro_rules! uuid_const {
    ($name:ident, $lit:expr) => {
        pub static $name: Lazy<Uuid> = Lazy::new(|| Uuid::parse_str($lit).expect("valid UUID literal"));
    };
}

// Device Information service.
uuid_const!(DEVICE_INFO_SERVICE, "0000180a-0000-1000-8000-00805f9b34fb");
uuid_const!(SERIAL_NUMBER_CHAR, "00002a25-0000-1000-8000-00805f9b34fb");
uuid_const!(MODEL_NUMBER_CHAR, "00002a24-0000-1000-8000-00805f9b34fb");
uuid_const!(FIRMWARE_REV_CHAR, "00002a28-0000-1000-8000-00805f9b34fb");

// Battery service.
uuid_const!(BATTERY_SERVICE, "0000180f-0000-1000-8000-00805f9b34fb");
uuid_const!(BATTERY_LEVEL_CHAR, "00002a19-0000-1000-8000-00805f9b34fb");

// Device Interface service (Garmin vendor-specific).
uuid_const!(DEVICE_INTERFACE_SERVICE, "6a4e2800-667b-11e3-949a-0800200c9a66");
uuid_const!(DEVICE_INTERFACE_NOTIFIER_CHAR, "6a4e2812-667b-11e3-949a-0800200c9a66");
uuid_const!(DEVICE_INTERFACE_WRITER_CHAR, "6a4e2822-667b-11e3-949a-0800200c9a66");

// Measurement service (Garmin vendor-specific).
uuid_const!(MEASUREMENT_SERVICE, "6a4e3400-667b-11e3-949a-0800200c9a66");
uuid_const!(MEASUREMENT_CHAR, "6a4e3401-667b-11e3-949a-0800200c9a66");
uuid_const!(CONTROL_POINT_CHAR, "6a4e3402-667b-11e3-949a-0800200c9a66");
uuid_const!(STATUS_CHAR, "6a4e3403-667b-11e3-949a-0800200c9a66");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_parse() {
        assert_ne!(*DEVICE_INTERFACE_NOTIFIER_CHAR, *DEVICE_INTERFACE_WRITER_CHAR);
        assert_ne!(*MEASUREMENT_CHAR, *STATUS_CHAR);
    }
}
