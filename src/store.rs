// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Document store for users, scan records, and spam checks.
//!
//! The analysis core treats persistence as an external collaborator, so the
//! store is a trait with an in-memory backend; a database-backed backend can
//! be swapped in without touching the HTTP layer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::model::{ScanPatch, ScanRecord, SpamCheckRecord, User};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, AppError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_user(&self, user: User) -> Result<User, AppError>;

    async fn insert_scan(&self, scan: ScanRecord) -> Result<ScanRecord, AppError>;
    async fn list_scans(&self, user_id: &str) -> Result<Vec<ScanRecord>, AppError>;
    async fn update_scan(
        &self,
        user_id: &str,
        scan_id: &str,
        patch: ScanPatch,
    ) -> Result<ScanRecord, AppError>;
    async fn delete_scan(&self, user_id: &str, scan_id: &str) -> Result<(), AppError>;

    async fn insert_spam_check(
        &self,
        check: SpamCheckRecord,
    ) -> Result<SpamCheckRecord, AppError>;
    async fn list_spam_checks(&self, user_id: &str) -> Result<Vec<SpamCheckRecord>, AppError>;
}

/// In-memory backend. Dies with the process; good enough for the service's
/// current single-node deployment and for tests.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    scans: RwLock<HashMap<String, ScanRecord>>,
    spam_checks: RwLock<HashMap<String, SpamCheckRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        let mut guard = self.users.write().await;

        let email_taken = guard
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if email_taken {
            return Err(AppError::bad_request("email already registered"));
        }

        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: User) -> Result<User, AppError> {
        let mut guard = self.users.write().await;
        if !guard.contains_key(&user.id) {
            return Err(AppError::not_found("user not found"));
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn insert_scan(&self, scan: ScanRecord) -> Result<ScanRecord, AppError> {
        self.scans
            .write()
            .await
            .insert(scan.id.clone(), scan.clone());
        Ok(scan)
    }

    async fn list_scans(&self, user_id: &str) -> Result<Vec<ScanRecord>, AppError> {
        let mut scans: Vec<ScanRecord> = self
            .scans
            .read()
            .await
            .values()
            .filter(|scan| scan.user_id == user_id)
            .cloned()
            .collect();

        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scans)
    }

    async fn update_scan(
        &self,
        user_id: &str,
        scan_id: &str,
        patch: ScanPatch,
    ) -> Result<ScanRecord, AppError> {
        let mut guard = self.scans.write().await;

        let scan = guard
            .get_mut(scan_id)
            .filter(|scan| scan.user_id == user_id)
            .ok_or_else(|| AppError::not_found("scan not found"))?;

        if let Some(title) = patch.title {
            scan.title = title;
        }
        if let Some(status) = patch.status {
            scan.status = status;
        }
        scan.updated_at = Utc::now();

        Ok(scan.clone())
    }

    async fn delete_scan(&self, user_id: &str, scan_id: &str) -> Result<(), AppError> {
        let mut guard = self.scans.write().await;

        let owned = guard
            .get(scan_id)
            .map(|scan| scan.user_id == user_id)
            .unwrap_or(false);
        if !owned {
            return Err(AppError::not_found("scan not found"));
        }

        guard.remove(scan_id);
        Ok(())
    }

    async fn insert_spam_check(
        &self,
        check: SpamCheckRecord,
    ) -> Result<SpamCheckRecord, AppError> {
        self.spam_checks
            .write()
            .await
            .insert(check.id.clone(), check.clone());
        Ok(check)
    }

    async fn list_spam_checks(&self, user_id: &str) -> Result<Vec<SpamCheckRecord>, AppError> {
        let mut checks: Vec<SpamCheckRecord> = self
            .spam_checks
            .read()
            .await
            .values()
            .filter(|check| check.user_id == user_id)
            .cloned()
            .collect();

        checks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(checks)
    }
}

/// Store handle that can wrap different backends.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentStore>,
}

impl Store {
    pub fn new(backend: impl DocumentStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub async fn insert_user(&self, user: User) -> Result<User, AppError> {
        self.backend.insert_user(user).await
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.backend.find_user(id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.backend.find_user_by_email(email).await
    }

    pub async fn update_user(&self, user: User) -> Result<User, AppError> {
        self.backend.update_user(user).await
    }

    pub async fn insert_scan(&self, scan: ScanRecord) -> Result<ScanRecord, AppError> {
        self.backend.insert_scan(scan).await
    }

    pub async fn list_scans(&self, user_id: &str) -> Result<Vec<ScanRecord>, AppError> {
        self.backend.list_scans(user_id).await
    }

    pub async fn update_scan(
        &self,
        user_id: &str,
        scan_id: &str,
        patch: ScanPatch,
    ) -> Result<ScanRecord, AppError> {
        self.backend.update_scan(user_id, scan_id, patch).await
    }

    pub async fn delete_scan(&self, user_id: &str, scan_id: &str) -> Result<(), AppError> {
        self.backend.delete_scan(user_id, scan_id).await
    }

    pub async fn insert_spam_check(
        &self,
        check: SpamCheckRecord,
    ) -> Result<SpamCheckRecord, AppError> {
        self.backend.insert_spam_check(check).await
    }

    pub async fn list_spam_checks(&self, user_id: &str) -> Result<Vec<SpamCheckRecord>, AppError> {
        self.backend.list_spam_checks(user_id).await
    }
}
