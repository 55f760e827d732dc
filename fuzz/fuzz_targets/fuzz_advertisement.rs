//! Fuzz target: `AdvertisementFields::parse`
//!
//! Feeds arbitrary advertising/scan-response payloads to the AD parser and
//! checks that it never panics and never reports more UUIDs than the
//! payload could hold.
//!
//! cargo fuzz run fuzz_advertisement

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermoband::relay::link::AdvertisementFields;

fuzz_target!(|data: &[u8]| {
    let fields = AdvertisementFields::parse(data);

    // Smallest UUID encoding is two bytes.
    assert!(fields.services.len() <= data.len() / 2);
    if let Some(name) = &fields.name {
        assert!(name.len() <= data.len() * 3);
    }
});
