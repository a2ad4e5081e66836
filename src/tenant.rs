use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;

use crate::clock::Clock;
use crate::engine::Engine;
use crate::limits::*;
use crate::notify::NotifyHub;
use crate::reconcile;

/// Manages per-company engines. Each company gets its own Engine, WAL,
/// compactor and (optionally) reconciler.
/// Company = database name from the pgwire connection.
pub struct TenantManager {
    engines: DashMap<String, Arc<Engine>>,
    data_dir: PathBuf,
    compact_threshold: u64,
    reconcile_interval: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl TenantManager {
    pub fn new(
        data_dir: PathBuf,
        compact_threshold: u64,
        reconcile_interval: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engines: DashMap::new(),
            data_dir,
            compact_threshold,
            reconcile_interval,
            clock,
        }
    }

    /// Get or lazily create an engine for the given company.
    pub fn get_or_create(&self, tenant: &str) -> std::io::Result<Arc<Engine>> {
        if let Some(engine) = self.engines.get(tenant) {
            return Ok(engine.value().clone());
        }
        if tenant.len() > MAX_TENANT_NAME_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "tenant name too long",
            ));
        }
        if self.engines.len() >= MAX_TENANTS {
            return Err(std::io::Error::other("too many tenants"));
        }

        if tenant.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty tenant name",
            ));
        }

        // Two connections may race here; the entry API keeps exactly one engine.
        let entry = self.engines.entry(tenant.to_string());
        if let dashmap::mapref::entry::Entry::Occupied(existing) = &entry {
            return Ok(existing.get().clone());
        }

        let wal_path = self.data_dir.join(format!("{}.wal", file_stem(tenant)));
        let notify = Arc::new(NotifyHub::new());
        let engine = Arc::new(Engine::new(tenant, wal_path, notify, self.clock.clone())?);

        tokio::spawn(reconcile::run_compactor(engine.clone(), self.compact_threshold));
        if let Some(period) = self.reconcile_interval {
            tokio::spawn(reconcile::run_reconciler(engine.clone(), period));
        }

        entry.or_insert(engine.clone());
        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.engines.len() as f64);
        info!("tenant {tenant} loaded");
        Ok(engine)
    }
}

/// Percent-encode every byte outside `[a-z0-9_-]`. Distinct company names
/// always get distinct files, even on case-insensitive filesystems, and no
/// name can escape the data dir.
fn file_stem(tenant: &str) -> String {
    let mut stem = String::with_capacity(tenant.len());
    for byte in tenant.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => stem.push(byte as char),
            _ => stem.push_str(&format!("%{byte:02X}")),
        }
    }
    stem
}
