// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn paginated_shape() {
    let page: Page<u32> =
        serde_json::from_str(r#"{"count": 3, "results": [1, 2, 3]}"#).unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page.into_vec(), vec![1, 2, 3]);
}

#[test]
fn bare_list_shape() {
    let page: Page<u32> = serde_json::from_str("[4, 5]").unwrap();
    assert!(!page.is_empty());
    assert_eq!(page.into_vec(), vec![4, 5]);
}

#[test]
fn empty_pages() {
    let page: Page<u32> = serde_json::from_str(r#"{"results": []}"#).unwrap();
    assert!(page.is_empty());
    let page: Page<u32> = serde_json::from_str("[]").unwrap();
    assert!(page.is_empty());
}
