//! Sync run orchestration
//!
//! Drives one complete synchronization run for one installation and one
//! resource kind: resolve credentials, fetch every page in order, then hand
//! the accumulated record set to the reconciler. Fetch failures abort the run
//! before any reconciliation; reconcile failures are counted, not raised.

use crate::client::{Page, RemoteClient};
use crate::reconciler::{Reconciler, RecordSink};
use crate::resolver::{self, EndpointCandidate};
use crate::{Result, SyncError};
use async_trait::async_trait;
use mirror_common::{Installation, ResourceKind, SyncSummary, TokenKind};
use mirror_config::Config;
use mirror_store::Db;
use std::time::Duration;
use tracing::{debug, info};

/// Page-fetch seam, implemented by [`RemoteClient`] in production
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        resource: ResourceKind,
        endpoints: &[EndpointCandidate],
        token: &str,
        page: u32,
    ) -> Result<Page>;
}

#[async_trait]
impl PageFetcher for RemoteClient {
    async fn fetch_page(
        &self,
        resource: ResourceKind,
        endpoints: &[EndpointCandidate],
        token: &str,
        page: u32,
    ) -> Result<Page> {
        RemoteClient::fetch_page(self, resource, endpoints, token, page).await
    }
}

/// Installation read seam, implemented by [`Db`]
pub trait InstallationLookup {
    fn get_installation(&self, remote_id: &str) -> anyhow::Result<Option<Installation>>;
}

impl InstallationLookup for Db {
    fn get_installation(&self, remote_id: &str) -> anyhow::Result<Option<Installation>> {
        Db::get_installation(self, remote_id)
    }
}

/// Drives full synchronization runs
pub struct SyncOrchestrator<F> {
    fetcher: F,
    reconciler: Reconciler,
    priority: Vec<TokenKind>,
    run_timeout: Duration,
}

impl SyncOrchestrator<RemoteClient> {
    /// Wire a production orchestrator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = RemoteClient::new(config.remote.request_timeout(), config.remote.per_page)?;
        Ok(Self::new(
            client,
            Reconciler::new(config.sync.batch_size),
            config.credentials.priority.clone(),
            config.sync.run_timeout(),
        ))
    }
}

impl<F: PageFetcher> SyncOrchestrator<F> {
    pub fn new(
        fetcher: F,
        reconciler: Reconciler,
        priority: Vec<TokenKind>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            reconciler,
            priority,
            run_timeout,
        }
    }

    /// Run one synchronization for `installation_id` and `resource`
    ///
    /// The whole run is bounded by the configured total timeout. Repeating a
    /// run is always safe: reconciliation is idempotent.
    pub async fn run<S>(
        &self,
        store: &mut S,
        installation_id: &str,
        resource: ResourceKind,
    ) -> Result<SyncSummary>
    where
        S: InstallationLookup + RecordSink + Send,
    {
        let seconds = self.run_timeout.as_secs();
        tokio::time::timeout(self.run_timeout, self.run_inner(store, installation_id, resource))
            .await
            .map_err(|_| SyncError::RunTimeout { seconds })?
    }

    async fn run_inner<S>(
        &self,
        store: &mut S,
        installation_id: &str,
        resource: ResourceKind,
    ) -> Result<SyncSummary>
    where
        S: InstallationLookup + RecordSink + Send,
    {
        let installation = store
            .get_installation(installation_id)?
            .ok_or_else(|| SyncError::InstallationNotFound(installation_id.to_string()))?;

        if !installation.active {
            return Err(SyncError::InactiveInstallation(
                installation.remote_installation_id,
            ));
        }

        let access = resolver::resolve(&installation, &self.priority)?;
        info!(
            installation_id,
            %resource,
            token_kind = access.token_kind.as_str(),
            "Starting sync run"
        );

        // Pages are fetched strictly in order: the termination condition
        // depends on each page's metadata
        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let fetched = self
                .fetcher
                .fetch_page(resource, &access.endpoints, &access.token, page)
                .await?;

            debug!(page, count = fetched.records.len(), "Fetched page");
            records.extend(fetched.records);

            match fetched.meta {
                Some(meta) if page < meta.total_pages => page += 1,
                // No metadata or last page reached: the fetch phase is done
                _ => break,
            }
        }

        let summary = self.reconciler.reconcile(
            store,
            &installation.remote_installation_id,
            resource,
            &records,
        )?;

        info!(
            installation_id,
            %resource,
            synced = summary.synced,
            errors = summary.errors,
            "Sync run complete"
        );
        Ok(summary)
    }
}
