#![no_main]

use cardtrust_lib::RevocationList;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(crl) = RevocationList::from_bytes(data) {
        let _ = crl.issuer().to_string();
        let _ = crl.crl_number_hex();
        let _ = crl.revoked_count();
        let _ = crl.is_fresh_at(i64::MAX);
        let _ = crl.is_fresh_at(i64::MIN);
    }
});
