// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end walk of spec.md §8 scenario 1 against a scripted mock
//! server: negotiate, authenticate (native), list a collection, then
//! stat an existing and a missing data object.

mod common;

use common::{AuthStatusReply, ChallengeReply, EmptyOkReply, ListReply, Reply, VersionReply, spawn_mock_server, test_config};
use irods_client::{
    client::registry::SessionRegistry,
    fs::{collection::Collection, object::DataObject, path::IrodsPath, stat::StatCache},
    protocol::messages::CsNegotiation,
};

#[tokio::test]
async fn connects_authenticates_lists_and_stats() {
    let replies = vec![
        Reply::ok(CsNegotiation { stance: "CS_NEG_DONT_CARE".to_string() }),
        Reply::ok(VersionReply { cookie: 7 }),
        Reply::ok(ChallengeReply { challenge: "0123456789abcdef".to_string() }),
        Reply::ok(AuthStatusReply { status: 0 }),
        Reply::ok(ListReply {
            entries: vec![("/tempZone/home/rods/sub1", true, 0), ("/tempZone/home/rods/file1.txt", false, 42)],
        }),
        Reply::status(4096, EmptyOkReply),
        Reply::error(-156500),
    ];
    let (host, port) = spawn_mock_server(replies).await;
    let cfg = test_config(host, port);

    let registry = SessionRegistry::new();
    let conn = registry.acquire(&cfg).await.expect("connect and authenticate");

    let cache = StatCache::new();
    let home = IrodsPath::new("/tempZone/home/rods", "/tempZone/home/rods");
    let coll = Collection::new(conn.clone(), home.clone());
    let entries = coll.list_children(&cache).await.expect("list_children");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.path == "/tempZone/home/rods/sub1" && e.is_collection));
    assert!(entries.iter().any(|e| e.path == "/tempZone/home/rods/file1.txt" && !e.is_collection));

    let home_cache = StatCache::new();
    let existing = DataObject::new(conn.clone(), home.clone());
    assert!(existing.exists(&home_cache).await.expect("stat existing"));
    assert_eq!(existing.length(&home_cache).await.expect("length"), 4096);

    let missing_cache = StatCache::new();
    let missing = DataObject::new(conn.clone(), IrodsPath::new("does_not_exist", "/tempZone/home/rods"));
    assert!(!missing.exists(&missing_cache).await.expect("stat missing"));

    registry.release(&cfg.account).await;
}
