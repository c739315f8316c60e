//! Fixed-window quota enforcement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use tmai_core::{ApiKeyRepository, CoreError, CoreResult, ScopedKey, UsageCounterStore, WindowKind};

/// Metering policy: quota is consumed when a request is accepted, before
/// the upstream generation call runs. The metered resource is accepted
/// requests, not successful generations, so a failed generation still
/// counts against the caller's budget.
pub const METER_ACCEPTED_REQUESTS: bool = true;

/// Enforces per-key fixed-window quotas.
pub struct QuotaEnforcer {
    counters: Arc<dyn UsageCounterStore>,
    api_keys: Arc<dyn ApiKeyRepository>,
}

impl QuotaEnforcer {
    /// Creates a new enforcer.
    #[must_use]
    pub fn new(counters: Arc<dyn UsageCounterStore>, api_keys: Arc<dyn ApiKeyRepository>) -> Self {
        Self { counters, api_keys }
    }

    /// Checks and consumes every configured window for the key, minute
    /// before month, short-circuiting on the first exhausted window so a
    /// minute rejection never consumes monthly budget.
    ///
    /// Each consumed window is one conditional-increment round trip to
    /// the store; concurrent requests against the same key are linearized
    /// there. On full success the key's last-used stamp is written
    /// best-effort: a stamp failure is logged and never fails the
    /// request.
    pub async fn enforce(&self, key: &ScopedKey, now: DateTime<Utc>) -> CoreResult<()> {
        let checks = [
            (WindowKind::Minute, key.limits.per_minute),
            (WindowKind::Month, key.limits.per_month),
        ];

        for (kind, limit) in checks {
            // No configured limit means unlimited along this axis.
            let Some(limit) = limit else { continue };

            let window_start = kind.window_start(now);
            let granted = self
                .counters
                .try_consume(
                    key.key_id,
                    kind,
                    window_start,
                    kind.expires_at(window_start),
                    limit,
                )
                .await?;

            if !granted {
                return Err(CoreError::rate_limited(kind));
            }
        }

        if let Err(err) = self.api_keys.touch_last_used(key.key_id, now).await {
            warn!(key_id = %key.key_id, error = %err, "failed to stamp last-used time");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    use tmai_core::{ApiKeyDescriptor, ApiKeyId, KeyLimits, ScopedKey, ServiceId, TenantId};

    /// In-memory counter store mirroring the conditional-increment
    /// contract of the SQLite implementation.
    #[derive(Default)]
    struct MemoryCounterStore {
        rows: Mutex<HashMap<(ApiKeyId, WindowKind, DateTime<Utc>), u32>>,
    }

    #[async_trait]
    impl UsageCounterStore for MemoryCounterStore {
        async fn try_consume(
            &self,
            key_id: ApiKeyId,
            kind: WindowKind,
            window_start: DateTime<Utc>,
            _expires_at: DateTime<Utc>,
            limit: u32,
        ) -> CoreResult<bool> {
            if limit == 0 {
                return Ok(false);
            }
            let mut rows = self.rows.lock();
            let count = rows.entry((key_id, kind, window_start)).or_insert(0);
            if *count < limit {
                *count += 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn window_count(
            &self,
            key_id: ApiKeyId,
            kind: WindowKind,
            window_start: DateTime<Utc>,
        ) -> CoreResult<u32> {
            Ok(*self
                .rows
                .lock()
                .get(&(key_id, kind, window_start))
                .unwrap_or(&0))
        }

        async fn purge_expired(&self, _now: DateTime<Utc>) -> CoreResult<u64> {
            Ok(0)
        }
    }

    /// Key repository stub that records last-used stamps.
    #[derive(Default)]
    struct MemoryKeyRepository {
        stamps: Mutex<Vec<ApiKeyId>>,
        fail_stamp: bool,
    }

    #[async_trait]
    impl ApiKeyRepository for MemoryKeyRepository {
        async fn create(&self, _d: &ApiKeyDescriptor, _hash: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn get(&self, _key_id: ApiKeyId) -> CoreResult<Option<ApiKeyDescriptor>> {
            Ok(None)
        }
        async fn find_by_hash(&self, _hash: &str) -> CoreResult<Option<ApiKeyDescriptor>> {
            Ok(None)
        }
        async fn list_by_service(&self, _s: ServiceId) -> CoreResult<Vec<ApiKeyDescriptor>> {
            Ok(Vec::new())
        }
        async fn revoke(&self, _key_id: ApiKeyId, _at: DateTime<Utc>) -> CoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _key_id: ApiKeyId) -> CoreResult<()> {
            Ok(())
        }
        async fn touch_last_used(&self, key_id: ApiKeyId, _at: DateTime<Utc>) -> CoreResult<()> {
            if self.fail_stamp {
                return Err(CoreError::storage("stamp failed"));
            }
            self.stamps.lock().push(key_id);
            Ok(())
        }
    }

    fn scoped_key(per_minute: Option<u32>, per_month: Option<u32>) -> ScopedKey {
        ScopedKey {
            key_id: ApiKeyId::new(),
            tenant_id: TenantId::new(),
            service_id: ServiceId::new(),
            limits: KeyLimits {
                per_minute,
                per_month,
            },
        }
    }

    fn enforcer_with(
        counters: Arc<MemoryCounterStore>,
        api_keys: Arc<MemoryKeyRepository>,
    ) -> QuotaEnforcer {
        QuotaEnforcer::new(counters, api_keys)
    }

    #[tokio::test]
    async fn grants_until_the_minute_limit_then_rejects() {
        let counters = Arc::new(MemoryCounterStore::default());
        let enforcer = enforcer_with(counters.clone(), Arc::new(MemoryKeyRepository::default()));
        let key = scoped_key(Some(2), None);
        let now = Utc::now();

        assert!(enforcer.enforce(&key, now).await.is_ok());
        assert!(enforcer.enforce(&key, now).await.is_ok());
        let err = enforcer.enforce(&key, now).await.expect_err("third is over");
        assert!(matches!(
            err,
            CoreError::RateLimited {
                window: WindowKind::Minute
            }
        ));
    }

    #[tokio::test]
    async fn minute_rejection_never_consumes_monthly_budget() {
        let counters = Arc::new(MemoryCounterStore::default());
        let enforcer = enforcer_with(counters.clone(), Arc::new(MemoryKeyRepository::default()));
        let key = scoped_key(Some(1), Some(100));
        let now = Utc::now();

        assert!(enforcer.enforce(&key, now).await.is_ok());
        assert!(enforcer.enforce(&key, now).await.is_err());

        let month_start = WindowKind::Month.window_start(now);
        let month_count = counters
            .window_count(key.key_id, WindowKind::Month, month_start)
            .await
            .unwrap();
        assert_eq!(month_count, 1, "only the granted request hit the month window");
    }

    #[tokio::test]
    async fn unlimited_axes_are_skipped_entirely() {
        let counters = Arc::new(MemoryCounterStore::default());
        let enforcer = enforcer_with(counters.clone(), Arc::new(MemoryKeyRepository::default()));
        let key = scoped_key(None, None);
        let now = Utc::now();

        for _ in 0..25 {
            assert!(enforcer.enforce(&key, now).await.is_ok());
        }
        let minute_start = WindowKind::Minute.window_start(now);
        assert_eq!(
            counters
                .window_count(key.key_id, WindowKind::Minute, minute_start)
                .await
                .unwrap(),
            0,
            "no counter row is ever written for an unlimited axis"
        );
    }

    #[tokio::test]
    async fn month_limit_rejects_after_minute_passes() {
        let counters = Arc::new(MemoryCounterStore::default());
        let enforcer = enforcer_with(counters.clone(), Arc::new(MemoryKeyRepository::default()));
        let key = scoped_key(Some(10), Some(1));
        let now = Utc::now();

        assert!(enforcer.enforce(&key, now).await.is_ok());
        let err = enforcer.enforce(&key, now).await.expect_err("month exhausted");
        assert!(matches!(
            err,
            CoreError::RateLimited {
                window: WindowKind::Month
            }
        ));
    }

    #[tokio::test]
    async fn success_stamps_last_used() {
        let api_keys = Arc::new(MemoryKeyRepository::default());
        let enforcer = enforcer_with(Arc::new(MemoryCounterStore::default()), api_keys.clone());
        let key = scoped_key(Some(5), None);

        enforcer.enforce(&key, Utc::now()).await.unwrap();
        assert_eq!(api_keys.stamps.lock().as_slice(), &[key.key_id]);
    }

    #[tokio::test]
    async fn stamp_failure_never_fails_the_request() {
        let api_keys = Arc::new(MemoryKeyRepository {
            fail_stamp: true,
            ..MemoryKeyRepository::default()
        });
        let enforcer = enforcer_with(Arc::new(MemoryCounterStore::default()), api_keys);
        let key = scoped_key(Some(5), None);

        assert!(enforcer.enforce(&key, Utc::now()).await.is_ok());
    }

    #[test]
    fn metering_policy_is_consume_before_generate() {
        assert!(METER_ACCEPTED_REQUESTS);
    }
}
