#![no_main]

use cardtrust_lib::{certificate_from_header, Certificate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Neither the file parser nor the header decoder may panic.
    if let Ok(cert) = Certificate::from_bytes(data) {
        let _ = cert.subject().to_string();
        let _ = cert.issuer().common_name();
        let _ = cert.serial_hex();
        let _ = cert.is_valid_at(0);
        let _ = cert.verify_signed_by(&cert);
    }

    if let Ok(value) = std::str::from_utf8(data) {
        let _ = certificate_from_header(value);
    }
});
