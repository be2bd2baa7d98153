// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the IPC protocol: every request round-trips through
//! JSON unchanged.

use crate::Request;
use proptest::prelude::*;

fn arb_tag() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,32}".prop_map(|s| s)
}

fn arb_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        (any::<u32>(), arb_tag())
            .prop_map(|(pid, tag)| Request::AddWatchTarget { process_id: pid, tag_name: tag }),
        arb_tag().prop_map(|tag| Request::RemoveWatchTarget { tag_name: tag }),
        Just(Request::GetWatchTargets),
        arb_tag().prop_map(|tag| Request::GetRecordedEvents { tag_name: tag }),
        arb_tag().prop_map(|tag| Request::ClearEvents { tag_name: tag }),
        Just(Request::GetStatus),
        Just(Request::Shutdown),
    ]
}

proptest! {
    #[test]
    fn any_request_round_trips_through_json(req in arb_request()) {
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(req, back);
    }
}
