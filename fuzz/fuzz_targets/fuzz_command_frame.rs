//! Fuzz target for command frame parsing
//!
//! `CommandFrame::decode` is the inverse of the encoder used for every
//! outgoing command; anything it accepts must encode back to the same bytes.

#![no_main]

use eccx08::frame::CommandFrame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = CommandFrame::decode(data) {
        let encoded = frame.encode().unwrap();
        assert_eq!(&encoded[..], &data[..encoded.len()]);
    }
});
