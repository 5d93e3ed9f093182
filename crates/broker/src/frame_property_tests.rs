// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use tokio::io::BufReader;

fn header_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,15}"
}

fn header_value() -> impl Strategy<Value = String> {
    // Any printable content plus the characters the escaping rules cover.
    proptest::collection::vec(
        prop_oneof![
            proptest::char::range('a', 'z').prop_map(|c| c.to_string()),
            Just(":".to_string()),
            Just("\\".to_string()),
            Just("\n".to_string()),
            Just("/".to_string()),
            Just(" ".to_string()),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn any_send_frame_round_trips(
        headers in proptest::collection::vec((header_name(), header_value()), 0..6),
        body in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut frame = Frame::new("SEND").header("destination", "/queue/x");
        for (name, value) in &headers {
            frame = frame.header(name, value.clone());
        }
        frame = frame.body(body);

        let encoded = frame.encode();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let decoded = runtime
            .block_on(read_frame(&mut BufReader::new(encoded.as_slice())))
            .unwrap()
            .unwrap();

        prop_assert_eq!(decoded.command, "SEND");
        prop_assert_eq!(decoded.body, frame.body);
        // Every header we wrote is recovered verbatim, in order.
        for (name, value) in &frame.headers {
            let found = decoded.headers.iter().find(|(n, _)| n == name);
            prop_assert!(found.is_some());
            if decoded.headers.iter().filter(|(n, _)| n == name).count() == 1 {
                prop_assert_eq!(&found.unwrap().1, value);
            }
        }
    }
}
