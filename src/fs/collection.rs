// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Collection (directory) operations layered on the same path-centric
//! surface as [`crate::fs::object::DataObject`] (spec.md §4.5).

use std::sync::Arc;

use crate::{
    client::connection::ConnectionHandle,
    error::{IrodsError, Result},
    fs::{
        path::IrodsPath,
        stat::{EntryKind, StatCache, StatEntry},
    },
    protocol::{
        header::MsgType,
        messages::{CollEntries, CollEntry, CollInp, DataObjCopyInp, EmptyReply, EndTransaction},
    },
};

const API_COLL_CREATE: i32 = 630;
const API_RM_COLL: i32 = 631;
const API_OPEN_COLL: i32 = 632;
const API_RENAME_COLL: i32 = 611;
const API_END_TRANSACTION: i32 = 701;

pub struct Collection {
    conn: Arc<ConnectionHandle>,
    path: IrodsPath,
}

impl Collection {
    pub fn new(conn: Arc<ConnectionHandle>, path: IrodsPath) -> Self {
        Collection { conn, path }
    }

    pub fn path(&self) -> &IrodsPath {
        &self.path
    }

    pub async fn list_children(&self, cache: &StatCache) -> Result<Vec<CollEntry>> {
        let req = CollInp { coll_name: self.path.absolute(), recursive: false, force: false };
        let (entries, _status) =
            self.conn.call::<_, CollEntries>(MsgType::ApiReq, API_OPEN_COLL, &req).await?;

        for entry in &entries.entries {
            let child = IrodsPath::new(&entry.path, "/");
            let kind = if entry.is_collection { EntryKind::Dir } else { EntryKind::File };
            cache.put(&child, StatEntry { kind, length: entry.size });
        }
        Ok(entries.entries)
    }

    /// Creates this collection. `parents` mirrors `mkdir -p`: when set, the
    /// server is asked to create missing intermediate collections too.
    ///
    /// Returns `false` when the collection already existed (no-op) and
    /// `true` when it, and any missing intermediates, were created.
    pub async fn mkdir(&self, parents: bool, cache: &StatCache) -> Result<bool> {
        let req = CollInp { coll_name: self.path.absolute(), recursive: parents, force: false };
        match self.conn.call::<_, EmptyReply>(MsgType::ApiReq, API_COLL_CREATE, &req).await {
            Ok(_) => {
                cache.invalidate(&self.path);
                self.end_transaction(true).await?;
                Ok(true)
            },
            Err(IrodsError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, force: bool, cache: &StatCache) -> Result<()> {
        let req = CollInp { coll_name: self.path.absolute(), recursive: true, force };
        self.conn.call::<_, EmptyReply>(MsgType::ApiReq, API_RM_COLL, &req).await?;
        cache.invalidate(&self.path);
        self.end_transaction(true).await
    }

    /// Commits the preceding catalog mutation. A recursive remove or a
    /// multi-intermediate create touches more than one catalog row, so the
    /// server expects an explicit commit rather than relying on each
    /// individual row write auto-committing.
    async fn end_transaction(&self, commit: bool) -> Result<()> {
        let req = EndTransaction { commit };
        self.conn.call::<_, EmptyReply>(MsgType::ApiReq, API_END_TRANSACTION, &req).await?;
        Ok(())
    }

    pub async fn rename(&mut self, target: IrodsPath, cache: &StatCache) -> Result<()> {
        if target == self.path {
            return Err(IrodsError::DuplicateData(format!(
                "rename to identical path {}",
                target.absolute()
            )));
        }
        let req = DataObjCopyInp {
            src_path: self.path.absolute(),
            dst_path: target.absolute(),
            is_rename: true,
            resource: None,
            force: false,
        };
        self.conn.call::<_, EmptyReply>(MsgType::ApiReq, API_RENAME_COLL, &req).await?;
        cache.invalidate(&self.path);
        cache.invalidate(&target);
        self.path = target;
        Ok(())
    }
}
