//! Unit of work: one SQLite transaction plus a member identity map.
//!
//! # Responsibility
//! - Scope a sequence of repository calls to one transaction.
//! - Track loaded members so repeated reads return the managed copy.
//!
//! # Invariants
//! - A row already in the identity map is never overwritten by a read;
//!   only `save`, `delete`, `evict` and `clear` change managed state.
//! - Bulk statements bypass the identity map. Callers must `clear` or
//!   `evict` before expecting fresh values for affected rows.
//! - Dropping a session without `commit` rolls the transaction back.
//! - The schema check runs before the transaction opens, so a fresh
//!   session holds no storage lock until its first repository call.
//! - A session belongs to one caller; it is not `Sync`.

use crate::model::audit::Auditor;
use crate::model::member::{Member, MemberId};
use crate::repo::error::RepoResult;
use crate::repo::guard::{ensure_connection_ready, MEMBERS_SHAPE, TEAMS_SHAPE};
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct Session<'conn> {
    tx: Transaction<'conn>,
    auditor: Auditor,
    members: RefCell<HashMap<MemberId, Member>>,
}

impl<'conn> Session<'conn> {
    /// Checks the connection schema, then starts a deferred transaction.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn begin(conn: &'conn mut Connection, auditor: Auditor) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[TEAMS_SHAPE, MEMBERS_SHAPE])?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        debug!(
            "event=session_begin module=repo status=ok auditor={}",
            auditor.name()
        );
        Ok(Self {
            tx,
            auditor,
            members: RefCell::new(HashMap::new()),
        })
    }

    /// Connection scoped to this unit of work.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    /// Commits all writes and releases every lock held by this session.
    pub fn commit(self) -> RepoResult<()> {
        let managed = self.members.borrow().len();
        self.tx.commit()?;
        info!("event=session_end module=repo status=committed managed={managed}");
        Ok(())
    }

    /// Discards all writes and releases every lock held by this session.
    pub fn rollback(self) -> RepoResult<()> {
        self.tx.rollback()?;
        info!("event=session_end module=repo status=rolled_back");
        Ok(())
    }

    /// Detaches every managed member. Subsequent reads hit storage.
    pub fn clear(&self) {
        let mut members = self.members.borrow_mut();
        debug!(
            "event=session_clear module=repo status=ok detached={}",
            members.len()
        );
        members.clear();
    }

    /// Detaches one member; returns whether it was managed.
    pub fn evict(&self, id: MemberId) -> bool {
        self.members.borrow_mut().remove(&id).is_some()
    }

    pub fn is_managed(&self, id: MemberId) -> bool {
        self.members.borrow().contains_key(&id)
    }

    pub fn managed_count(&self) -> usize {
        self.members.borrow().len()
    }

    pub(crate) fn cached(&self, id: MemberId) -> Option<Member> {
        self.members.borrow().get(&id).cloned()
    }

    /// Records the state just written by `save`.
    pub(crate) fn store(&self, id: MemberId, member: &Member) {
        self.members.borrow_mut().insert(id, member.clone());
    }

    /// Returns the managed copy of a freshly loaded row, registering the
    /// row first if it is not tracked yet.
    pub(crate) fn manage(&self, id: MemberId, loaded: Member) -> Member {
        self.members
            .borrow_mut()
            .entry(id)
            .or_insert(loaded)
            .clone()
    }
}
