#![no_main]

use libfuzzer_sys::fuzz_target;
use tictactoe_client::codec;

fuzz_target!(|data: &[u8]| {
    // Raw-byte path, including invalid UTF-8.
    let from_slice = codec::decode_slice(data);

    if let Ok(text) = std::str::from_utf8(data) {
        let from_str = codec::decode(text);
        assert_eq!(from_slice.is_ok(), from_str.is_ok());
    }
});
