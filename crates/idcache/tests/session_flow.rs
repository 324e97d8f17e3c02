//! End-to-end session flows through the identity cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use idcache::sync::{MemoryIdentityService, MemorySessionHolder, SessionHolder, SyncError};
use idcache::{
    bind_scope, CacheConfig, CacheError, Capability, CapabilitySet, IdentityCache, Observer,
    PermissionMap, RawRights, Refresh, ScopedValue, SyncConfig, User,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

struct Setup {
    service: Arc<MemoryIdentityService>,
    session: Arc<MemorySessionHolder>,
    cache: IdentityCache,
}

fn setup() -> anyhow::Result<Setup> {
    init_tracing();
    let session = Arc::new(MemorySessionHolder::new());
    let service = Arc::new(MemoryIdentityService::new(session.clone()));
    service.add_account(
        "a@example.com",
        "pw",
        User::new("u1")
            .with_permission("docs", RawRights::entity("e1", 0x03))
            .with_permission("admin", RawRights::Flat(0x0F))
            .with_field("name", "Ada"),
    );
    let cache = IdentityCache::new(service.clone(), session.clone(), CacheConfig::default())?;
    Ok(Setup {
        service,
        session,
        cache,
    })
}

fn recorder<T: Clone + Send + 'static>() -> (Observer<T>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = Observer::new(move |value: T| sink.lock().push(value));
    (observer, seen)
}

fn read_create() -> CapabilitySet {
    [Capability::Create, Capability::Read].into_iter().collect()
}

#[tokio::test]
async fn test_sign_in_notifies_every_granularity() -> anyhow::Result<()> {
    let s = setup()?;

    let (everything, everything_seen) = recorder::<PermissionMap>();
    let (by_name, name_seen) = recorder::<ScopedValue>();
    let (by_entity, entity_seen) = recorder::<ScopedValue>();
    let _a = s.cache.subscribe_permissions(everything);
    let _b = s.cache.subscribe_scope(by_name, "docs", None);
    let _c = s.cache.subscribe_scope(by_entity, "docs", Some("e1"));

    let sign_in = s
        .cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;
    assert_eq!(sign_in.user.as_ref().map(|u| u.id.as_str()), Some("u1"));

    let everything_seen = everything_seen.lock();
    assert_eq!(everything_seen.len(), 2);
    assert!(everything_seen[0].is_empty());
    assert_eq!(everything_seen[1]["docs"]["e1"], read_create());

    let entity_seen = entity_seen.lock();
    assert_eq!(entity_seen.len(), 2);
    assert_eq!(entity_seen[1], ScopedValue::Rights(read_create()));

    let name_seen = name_seen.lock();
    assert_eq!(name_seen.len(), 2);
    let entities = name_seen[1].as_entities().cloned().unwrap_or_default();
    assert_eq!(entities.get("e1"), Some(&read_create()));

    assert!(s.cache.can("admin", None, Capability::Delete));
    assert!(s.cache.can("docs", Some("e1"), Capability::Read));
    assert!(!s.cache.can("docs", Some("e1"), Capability::Delete));
    assert!(s.cache.rights("docs", Some("e2")).is_empty());
    assert_eq!(
        s.cache.user().and_then(|u| u.field("name").cloned()),
        Some(serde_json::json!("Ada"))
    );
    Ok(())
}

#[tokio::test]
async fn test_sign_out_resets_scoped_observers() -> anyhow::Result<()> {
    let s = setup()?;
    s.cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;

    let (by_entity, seen) = recorder::<ScopedValue>();
    let _sub = s.cache.subscribe_scope(by_entity, "docs", Some("e1"));
    let (user_observer, users_seen) = recorder::<Option<User>>();
    let _user_sub = s.cache.subscribe_user(user_observer);

    assert!(s.cache.sign_out().await?);

    assert_eq!(
        seen.lock().last(),
        Some(&ScopedValue::Rights(CapabilitySet::new()))
    );
    assert_eq!(users_seen.lock().last(), Some(&None));
    assert!(!s.cache.is_signed_in());
    assert_eq!(s.service.session_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_leaves_nothing_behind() {
    init_tracing();
    let session = Arc::new(MemorySessionHolder::new());
    let service = Arc::new(MemoryIdentityService::new(session.clone()));
    let config = CacheConfig::default()
        .with_sync(SyncConfig::default().with_request_timeout(Duration::ZERO));

    let result = IdentityCache::new(service.clone(), session, config);

    assert!(matches!(result, Err(CacheError::Config(_))));
    // No controller means no listener was registered; invalidating is inert.
    service.invalidate();
}

#[tokio::test]
async fn test_invalidation_calls_hook_and_resets() -> anyhow::Result<()> {
    let s = setup()?;
    s.cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    s.cache.on_no_session(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    s.service.invalidate();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(s.cache.user().is_none());
    assert!(s.cache.permissions().snapshot().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_revoked_session_refresh_is_consumed() -> anyhow::Result<()> {
    let s = setup()?;
    let sign_in = s
        .cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;
    s.service.revoke_session(&sign_in.session);

    assert_eq!(s.cache.update().await?, Refresh::SessionHandled);
    assert!(s.cache.user().is_none());
    Ok(())
}

#[tokio::test]
async fn test_update_replaces_wholesale() -> anyhow::Result<()> {
    let s = setup()?;
    s.cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;

    s.service.update_user(
        "a@example.com",
        User::new("u1").with_permission("sheets", RawRights::entity("s1", 0x02)),
    );
    let refresh = s.cache.update().await?;

    assert!(matches!(refresh, Refresh::Applied(_)));
    let map = s.cache.permissions().snapshot();
    assert!(!map.contains_key("docs"));
    assert!(s.cache.can("sheets", Some("s1"), Capability::Read));
    Ok(())
}

#[tokio::test]
async fn test_stale_refresh_does_not_resurrect_user() -> anyhow::Result<()> {
    let s = setup()?;
    s.cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;

    s.service.hold_fetches();
    let service = Arc::clone(&s.service);
    let (refresh, signed_out) = tokio::join!(s.cache.update(), async {
        let signed_out = s.cache.sign_out().await;
        service.release_fetch();
        signed_out
    });

    assert!(signed_out?);
    assert_eq!(refresh?, Refresh::Superseded);
    assert!(s.cache.user().is_none());
    Ok(())
}

#[tokio::test]
async fn test_wildcard_entity_is_name_scope() -> anyhow::Result<()> {
    let s = setup()?;
    let bound = bind_scope(&s.cache, "admin", Some("*"));

    s.cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await?;

    let entities = bound.get().as_entities().cloned().unwrap_or_default();
    assert_eq!(entities.get("*"), Some(&CapabilitySet::all()));
    assert_eq!(s.cache.rights("admin", None), CapabilitySet::all());
    Ok(())
}

#[tokio::test]
async fn test_sign_in_with_token() -> anyhow::Result<()> {
    let s = setup()?;
    let token = s
        .service
        .issue_session("a@example.com")
        .ok_or_else(|| anyhow::anyhow!("unknown account"))?;

    let sign_in = s.cache.sign_in(token.clone()).await?;

    assert_eq!(sign_in.session, token);
    assert_eq!(s.session.active_session(), Some(token));
    assert!(s.cache.is_signed_in());
    Ok(())
}

#[tokio::test]
async fn test_transport_error_surfaces() -> anyhow::Result<()> {
    let s = setup()?;
    s.service
        .fail_next(SyncError::Transport("connection refused".into()));

    let err = s
        .cache
        .sign_in_with_credentials("a@example.com", "pw", None)
        .await
        .unwrap_err();

    assert!(matches!(err, CacheError::Sync(SyncError::Transport(_))));
    assert!(!s.cache.is_signed_in());
    Ok(())
}
