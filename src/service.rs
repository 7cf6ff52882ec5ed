//! Site operations shared by the HTTP API and the CLI.
//!
//! Every mutating operation holds the write lock across load, mutate and save
//! so concurrent requests cannot interleave their writes.

use crate::balance::{BalanceData, BalanceResolver};
use crate::error::AppError;
use crate::poller::{self, BatchResultEntry, BatchSummary};
use crate::site::{compute_stats, NewSite, Site, SiteStats, SiteUpdate};
use crate::store::SiteStore;
use chrono::Utc;
use tokio::sync::Mutex;

/// Report returned by a full balance check.
#[derive(Debug, Clone)]
pub struct CheckAllReport {
    pub results: Vec<BatchResultEntry>,
    pub summary: BatchSummary,
}

pub struct SiteService {
    store: Box<dyn SiteStore>,
    resolver: BalanceResolver,
    write_lock: Mutex<()>,
}

impl SiteService {
    pub fn new(store: Box<dyn SiteStore>, resolver: BalanceResolver) -> Self {
        Self {
            store,
            resolver,
            write_lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Result<Vec<Site>, AppError> {
        Ok(self.store.load()?)
    }

    pub fn stats(&self) -> Result<SiteStats, AppError> {
        Ok(compute_stats(&self.store.load()?))
    }

    pub async fn create(&self, request: NewSite) -> Result<Site, AppError> {
        let site = Site::create(request, Utc::now()).map_err(AppError::Validation)?;

        let _guard = self.write_lock.lock().await;
        let mut sites = self.store.load()?;
        sites.push(site.clone());
        self.store.save(&sites)?;

        tracing::info!(id = %site.id, name = %site.name, "site added");
        Ok(site)
    }

    pub async fn update(&self, id: &str, update: SiteUpdate) -> Result<Site, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut sites = self.store.load()?;
        let site = sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        site.apply_update(update, Utc::now())
            .map_err(AppError::Validation)?;
        let updated = site.clone();
        self.store.save(&sites)?;

        tracing::info!(id = %updated.id, name = %updated.name, "site updated");
        Ok(updated)
    }

    /// Remove a site. Unknown ids are not an error.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut sites = self.store.load()?;
        let before = sites.len();
        sites.retain(|s| s.id != id);
        self.store.save(&sites)?;

        if sites.len() < before {
            tracing::info!(id = %id, "site deleted");
        }
        Ok(())
    }

    /// Check one site and persist its new balance group.
    ///
    /// A failed check leaves the store untouched and reports the specific
    /// resolution error.
    pub async fn check_one(&self, id: &str) -> Result<BalanceData, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut sites = self.store.load()?;
        let index = sites
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let site = sites[index].clone();
        let name = site.name.clone();
        let (site, result) = poller::poll_one(&self.resolver, site).await;

        match result {
            Ok(data) => {
                sites[index] = site;
                self.store.save(&sites)?;
                tracing::info!(site = %name, balance = data.balance, models = data.model_count(), "site checked");
                Ok(data)
            }
            Err(e) => {
                tracing::warn!(site = %name, kind = e.kind(), error = %e, "site check failed");
                Err(AppError::Resolution(e))
            }
        }
    }

    /// Check every site in stored order and save the collection once.
    ///
    /// An unreadable store is polled as an empty collection and is not
    /// written back.
    pub async fn check_all(&self) -> Result<CheckAllReport, AppError> {
        let _guard = self.write_lock.lock().await;
        let sites = match self.store.load() {
            Ok(sites) => sites,
            Err(e) => {
                tracing::warn!(error = %e, "site store unreadable, nothing to poll");
                return Ok(CheckAllReport {
                    results: Vec::new(),
                    summary: BatchSummary {
                        total: 0,
                        succeeded: 0,
                        failed: 0,
                    },
                });
            }
        };

        let poll = poller::poll_all(&self.resolver, sites).await;
        let summary = poll.summary();
        self.store.save(&poll.records)?;

        Ok(CheckAllReport {
            results: poll.results,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, SqliteStore, StorageError};
    use crate::poller::EntryOutcome;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    /// In-memory store that counts saves and can be told to fail.
    #[derive(Clone, Default)]
    struct CountingStore {
        sites: Arc<StdMutex<Vec<Site>>>,
        saves: Arc<AtomicUsize>,
        fail_load: bool,
        fail_save: bool,
    }

    impl SiteStore for CountingStore {
        fn load(&self) -> Result<Vec<Site>, StorageError> {
            if self.fail_load {
                return Err(StorageError::Lock("unreadable".to_string()));
            }
            Ok(self.sites.lock().unwrap().clone())
        }

        fn save(&self, sites: &[Site]) -> Result<(), StorageError> {
            if self.fail_save {
                return Err(StorageError::Lock("read-only".to_string()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.sites.lock().unwrap() = sites.to_vec();
            Ok(())
        }
    }

    fn new_site(name: &str, url: String) -> NewSite {
        NewSite {
            name: name.to_string(),
            url,
            api_key: "sk-test".to_string(),
            balance: None,
            status: None,
        }
    }

    fn service(store: CountingStore) -> SiteService {
        SiteService::new(Box::new(store), BalanceResolver::new().unwrap())
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json")).unwrap();
        let service = SiteService::new(Box::new(store), BalanceResolver::new().unwrap());

        let site = service
            .create(new_site("mirror", "https://mirror.example".to_string()))
            .await
            .unwrap();
        assert_eq!(service.list().unwrap().len(), 1);

        let updated = service
            .update(
                &site.id,
                SiteUpdate {
                    name: "renamed".to_string(),
                    url: "https://mirror.example/".to_string(),
                    api_key: "sk-new".to_string(),
                    balance: Some(serde_json::json!(4)),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(service.list().unwrap()[0].api_key, "sk-new");

        service.delete(&site.id).await.unwrap();
        assert!(service.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_unknown_site_is_not_found() {
        let service = SiteService::new(
            Box::new(SqliteStore::in_memory().unwrap()),
            BalanceResolver::new().unwrap(),
        );

        let err = service
            .update(
                "missing",
                SiteUpdate {
                    name: "x".to_string(),
                    url: "https://x.example".to_string(),
                    ..SiteUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_url() {
        let service = service(CountingStore::default());
        let err = service
            .create(new_site("bad", "ftp://nowhere".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn check_one_persists_once_and_returns_balance() {
        let mut server = mockito::Server::new_async().await;
        let _billing = server
            .mock("GET", "/v1/dashboard/billing/subscription")
            .with_status(200)
            .with_body(r#"{"hard_limit_usd": 12.345}"#)
            .create_async()
            .await;
        let _models = server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "gpt-4"}]}"#)
            .create_async()
            .await;

        let store = CountingStore::default();
        let service = service(store.clone());
        let site = service.create(new_site("s", server.url())).await.unwrap();
        let saves_before = store.saves.load(Ordering::SeqCst);

        let data = service.check_one(&site.id).await.unwrap();

        assert_eq!(data.balance, 12.35);
        assert_eq!(data.total_limit, Some(12.345));
        assert_eq!(data.model_count(), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), saves_before + 1);
        let stored = &service.list().unwrap()[0];
        assert_eq!(stored.balance, 12.35);
        assert_eq!(stored.models, vec!["gpt-4".to_string()]);
    }

    #[tokio::test]
    async fn check_one_failure_leaves_store_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _billing = server
            .mock("GET", "/v1/dashboard/billing/subscription")
            .with_status(200)
            .with_body(r#"{"error": {"message": "quota exhausted"}}"#)
            .create_async()
            .await;

        let store = CountingStore::default();
        let service = service(store.clone());
        let site = service.create(new_site("s", server.url())).await.unwrap();
        let saves_before = store.saves.load(Ordering::SeqCst);

        let err = service.check_one(&site.id).await.unwrap_err();

        assert_eq!(err.to_string(), "quota exhausted");
        assert_eq!(store.saves.load(Ordering::SeqCst), saves_before);
        assert_eq!(service.list().unwrap()[0], site);
    }

    #[tokio::test]
    async fn check_one_unknown_site_is_not_found() {
        let service = service(CountingStore::default());
        let err = service.check_one("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn check_all_saves_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/ok/v1/dashboard/billing/subscription")
            .with_status(200)
            .with_body(r#"{"hard_limit_usd": 1}"#)
            .create_async()
            .await;
        let _ok_models = server
            .mock("GET", "/ok/v1/models")
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;
        let _bad = server
            .mock("GET", "/bad/v1/dashboard/billing/subscription")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let store = CountingStore::default();
        let service = service(store.clone());
        service
            .create(new_site("ok", format!("{}/ok", server.url())))
            .await
            .unwrap();
        service
            .create(new_site("bad", format!("{}/bad", server.url())))
            .await
            .unwrap();
        let saves_before = store.saves.load(Ordering::SeqCst);

        let report = service.check_all().await.unwrap();

        assert_eq!(store.saves.load(Ordering::SeqCst), saves_before + 1);
        assert_eq!(report.summary, BatchSummary { total: 2, succeeded: 1, failed: 1 });
        assert_eq!(report.results[0].name, "ok");
        assert_eq!(
            report.results[1].outcome,
            EntryOutcome::Failure {
                message: "failed to retrieve subscription info".to_string()
            }
        );
    }

    #[tokio::test]
    async fn check_all_on_unreadable_store_is_empty_and_writes_nothing() {
        let store = CountingStore {
            fail_load: true,
            ..CountingStore::default()
        };
        let service = service(store.clone());

        let report = service.check_all().await.unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.summary.total, 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn check_all_save_failure_is_a_storage_error() {
        let store = CountingStore {
            fail_save: true,
            ..CountingStore::default()
        };
        let service = service(store);

        let err = service.check_all().await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
    }
}
