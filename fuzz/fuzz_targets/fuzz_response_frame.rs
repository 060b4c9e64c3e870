//! Fuzz target for response frame validation
//!
//! Every byte read back from the bus passes through `decode_response`
//! before the payload is used. Checks:
//! - Declared lengths that disagree with the buffer
//! - Truncated frames and CRC mismatches
//! - Accepted payloads always have the requested size

#![no_main]

use eccx08::frame::{decode_response, ResponseFrame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&expected, raw)) = data.split_first() else {
        return;
    };
    let expected = expected as usize;

    if let Ok(payload) = decode_response(raw, expected) {
        assert_eq!(payload.len(), expected);

        // An accepted frame re-encodes to the bytes it came from
        let encoded = ResponseFrame::new(&payload).encode().unwrap();
        assert_eq!(&encoded[..], &raw[..encoded.len()]);
    }
});
