//! Fuzz target: relay web routes
//!
//! Splits the input into a URI and a form body and runs it through
//! `RelayWebApp::handle` with a simulated central and in-memory storage.
//! Any input must produce a response without panicking, and a rejected
//! `/save` must leave the stored target untouched.
//!
//! cargo fuzz run fuzz_web_request

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermoband::adapters::ble_central::SimCentral;
use thermoband::adapters::nvs::NvsAdapter;
use thermoband::relay::{Method, RelayWebApp, WebRequest};

fuzz_target!(|data: &[u8]| {
    let Ok(storage) = NvsAdapter::new() else {
        return;
    };
    let text = String::from_utf8_lossy(data);
    let (uri, body) = text.split_once('\n').unwrap_or((&text, ""));
    let method = if data.first().is_some_and(|b| b & 1 == 1) {
        Method::Post
    } else {
        Method::Get
    };

    let mut app = RelayWebApp::new(SimCentral::new(), storage);
    let before = app.link().config().clone();
    let resp = app.handle(&WebRequest::new(method, uri, body));

    assert!((200..600).contains(&resp.status));
    if resp.status != 302 {
        assert_eq!(app.link().config(), &before);
    }
});
