//! Testing utilities for resources, data sources and the provider.
//!
//! - [`FakeRemote`] is an in-memory [`RemoteApi`] for any endpoint that
//!   implements [`Simulate`]. It records calls and can inject failures.
//! - [`LifecycleTester`] drives one [`ResourceLifecycle`] over a
//!   [`MemoryStateStore`].
//! - [`ProviderTester`] drives a [`GitlabProvider`] by type name with JSON
//!   state, the way the orchestrating engine does.
//!
//! # Example
//!
//! ```ignore
//! use crate::testing::{FakeRemote, LifecycleTester};
//! use crate::resources::release_link::ReleaseLink;
//! use crate::resource::Reconciler;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_create_release_link() {
//!     let api = Arc::new(FakeRemote::<ReleaseLink>::new());
//!     let reconciler = Reconciler::new(ReleaseLink, api.clone());
//!     let mut tester = LifecycleTester::new(&reconciler);
//!
//!     let state = tester.create(json!({
//!         "project": "group/app",
//!         "tag_name": "v1.0",
//!         "name": "docs",
//!         "url": "https://example.com/docs",
//!     })).await.unwrap();
//!
//!     assert_eq!(state.get_str("id"), Some("group/app:v1.0:1"));
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::provider::GitlabProvider;
use crate::remote::{Endpoint, Page, PageRequest, RemoteApi};
use crate::resource::ResourceLifecycle;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::state::{MemoryStateStore, StateMap, StateStore};
use crate::types::ImportedResource;
use crate::validation::validate;

// =========================================================================
// Fake remote
// =========================================================================

/// How an endpoint's fake server behaves.
pub trait Simulate: Endpoint<LeafId = u64> {
    /// The entity the server would return after creating `payload` as `leaf`.
    fn create_entity(scope: &Self::Scope, leaf: u64, payload: &Self::CreateRequest)
        -> Self::Entity;

    /// Apply a partial update the way the server would.
    fn update_entity(entity: &mut Self::Entity, changes: &Self::UpdateRequest);
}

/// A call observed by a [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `create`
    Create,
    /// `get` of a leaf id.
    Get(u64),
    /// `update` of a leaf id.
    Update(u64),
    /// `delete` of a leaf id.
    Delete(u64),
    /// `list` of a page number.
    List(u32),
    /// An endpoint-specific call, e.g. stopping an environment.
    Custom(String),
}

struct FakeState<E: Simulate> {
    next_id: u64,
    entities: BTreeMap<u64, (E::Scope, E::Entity)>,
    calls: Vec<Call>,
    failures: VecDeque<ProviderError>,
    creates: Vec<E::CreateRequest>,
    updates: Vec<E::UpdateRequest>,
}

/// An in-memory server for endpoint `E`.
///
/// Leaf ids are handed out sequentially starting at 1. Listing returns the
/// entities of a scope in id order.
pub struct FakeRemote<E: Simulate> {
    state: Mutex<FakeState<E>>,
}

impl<E: Simulate> Default for FakeRemote<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Simulate> FakeRemote<E> {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an empty server whose first leaf id is `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: first_id,
                entities: BTreeMap::new(),
                calls: Vec::new(),
                failures: VecDeque::new(),
                creates: Vec::new(),
                updates: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put an entity in place without recording a call.
    pub fn seed(&self, scope: E::Scope, payload: &E::CreateRequest) -> u64 {
        let mut state = self.lock();
        let leaf = state.next_id;
        state.next_id += 1;
        let entity = E::create_entity(&scope, leaf, payload);
        state.entities.insert(leaf, (scope, entity));
        leaf
    }

    /// The current entity for `leaf`.
    pub fn entity(&self, leaf: u64) -> Option<E::Entity> {
        self.lock().entities.get(&leaf).map(|(_, e)| e.clone())
    }

    /// Number of entities held.
    pub fn len(&self) -> usize {
        self.lock().entities.len()
    }

    /// Whether no entities are held.
    pub fn is_empty(&self) -> bool {
        self.lock().entities.is_empty()
    }

    /// Delete `leaf` behind the provider's back.
    pub fn remove(&self, leaf: u64) -> bool {
        self.lock().entities.remove(&leaf).is_some()
    }

    /// Mutate an entity in place, e.g. to simulate drift.
    pub fn modify<T>(
        &self,
        leaf: u64,
        f: impl FnOnce(&mut E::Entity) -> T,
    ) -> Result<T, ProviderError> {
        let mut state = self.lock();
        match state.entities.get_mut(&leaf) {
            Some((_, entity)) => Ok(f(entity)),
            None => Err(not_found::<E>(leaf)),
        }
    }

    /// Fail the next call, of any kind, with `err`.
    pub fn fail_next(&self, err: ProviderError) {
        self.lock().failures.push_back(err);
    }

    /// Record a call and consume a pending injected failure.
    pub fn record(&self, call: Call) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Calls observed so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that change remote state.
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Get(_) | Call::List(_)))
            .collect()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Create payloads received so far.
    pub fn create_payloads(&self) -> Vec<E::CreateRequest> {
        self.lock().creates.clone()
    }

    /// Update payloads received so far.
    pub fn update_payloads(&self) -> Vec<E::UpdateRequest> {
        self.lock().updates.clone()
    }

    fn lookup(&self, scope: &E::Scope, leaf: u64) -> Result<E::Entity, ProviderError> {
        match self.lock().entities.get(&leaf) {
            Some((owner, entity)) if owner == scope => Ok(entity.clone()),
            _ => Err(not_found::<E>(leaf)),
        }
    }
}

fn not_found<E: Endpoint>(leaf: u64) -> ProviderError {
    ProviderError::NotFound(format!("{} {}", E::KIND, leaf))
}

#[async_trait]
impl<E: Simulate> RemoteApi<E> for FakeRemote<E> {
    async fn create(
        &self,
        scope: &E::Scope,
        payload: E::CreateRequest,
    ) -> Result<E::Entity, ProviderError> {
        self.record(Call::Create)?;
        let mut state = self.lock();
        let leaf = state.next_id;
        state.next_id += 1;
        let entity = E::create_entity(scope, leaf, &payload);
        state.creates.push(payload);
        state.entities.insert(leaf, (scope.clone(), entity.clone()));
        Ok(entity)
    }

    async fn get(&self, scope: &E::Scope, leaf: u64) -> Result<E::Entity, ProviderError> {
        self.record(Call::Get(leaf))?;
        self.lookup(scope, leaf)
    }

    async fn update(
        &self,
        scope: &E::Scope,
        leaf: u64,
        changes: E::UpdateRequest,
    ) -> Result<E::Entity, ProviderError> {
        self.record(Call::Update(leaf))?;
        self.lookup(scope, leaf)?;
        let mut state = self.lock();
        let updated = match state.entities.get_mut(&leaf) {
            Some((_, entity)) => {
                E::update_entity(entity, &changes);
                entity.clone()
            },
            None => return Err(not_found::<E>(leaf)),
        };
        state.updates.push(changes);
        Ok(updated)
    }

    async fn delete(&self, scope: &E::Scope, leaf: u64) -> Result<(), ProviderError> {
        self.record(Call::Delete(leaf))?;
        self.lookup(scope, leaf)?;
        self.lock().entities.remove(&leaf);
        Ok(())
    }

    async fn list(
        &self,
        scope: &E::Scope,
        page: PageRequest,
    ) -> Result<Page<E::Entity>, ProviderError> {
        self.record(Call::List(page.page))?;
        let per_page = page.per_page.max(1) as usize;
        let matching: Vec<E::Entity> = self
            .lock()
            .entities
            .values()
            .filter(|(owner, _)| owner == scope)
            .map(|(_, e)| e.clone())
            .collect();

        let start = (page.page.saturating_sub(1) as usize) * per_page;
        let items: Vec<E::Entity> = matching.iter().skip(start).take(per_page).cloned().collect();
        let next_page = if start + per_page < matching.len() {
            page.page + 1
        } else {
            0
        };
        Ok(Page::new(items, next_page))
    }
}

// =========================================================================
// Lifecycle tester
// =========================================================================

/// Drives one resource type through its lifecycle over an in-memory store.
pub struct LifecycleTester<'a> {
    lifecycle: &'a dyn ResourceLifecycle,
    store: MemoryStateStore,
    cancel: CancellationToken,
}

impl<'a> LifecycleTester<'a> {
    /// Create a tester with an empty store.
    pub fn new(lifecycle: &'a dyn ResourceLifecycle) -> Self {
        Self {
            lifecycle,
            store: MemoryStateStore::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Start from an existing store, e.g. one holding a stale identifier.
    pub fn with_store(mut self, store: MemoryStateStore) -> Self {
        self.store = store;
        self
    }

    /// The token passed to every operation.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryStateStore {
        &self.store
    }

    /// The stored identifier.
    pub fn id(&self) -> Option<&str> {
        self.store.id()
    }

    /// The current state.
    pub fn state(&self) -> StateMap {
        self.store.snapshot()
    }

    /// Validate a configuration against the resource schema.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate(&self.lifecycle.schema(), config)
    }

    /// Create, returning the state read back.
    pub async fn create(&mut self, config: Value) -> Result<StateMap, ProviderError> {
        self.lifecycle
            .create(&self.cancel, &config, &mut self.store)
            .await?;
        Ok(self.state())
    }

    /// Read, returning `None` if the entity vanished.
    pub async fn read(&mut self) -> Result<Option<StateMap>, ProviderError> {
        self.lifecycle.read(&self.cancel, &mut self.store).await?;
        Ok(self.store.id().map(|_| self.state()))
    }

    /// Update, returning the state read back.
    pub async fn update(&mut self, config: Value) -> Result<StateMap, ProviderError> {
        self.lifecycle
            .update(&self.cancel, &config, &mut self.store)
            .await?;
        Ok(self.state())
    }

    /// Delete.
    pub async fn delete(&mut self) -> Result<(), ProviderError> {
        self.lifecycle.delete(&self.cancel, &mut self.store).await
    }

    /// Import by identifier, returning the hydrated state.
    pub async fn import(&mut self, raw_id: &str) -> Result<StateMap, ProviderError> {
        self.lifecycle
            .import(&self.cancel, raw_id, &mut self.store)
            .await?;
        Ok(self.state())
    }

    /// Run create, read, update, read and delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &mut self,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<StateMap, ProviderError> {
        self.create(initial_config).await?;
        self.read().await?;
        self.update(updated_config).await?;
        let updated = self.read().await?.ok_or_else(|| {
            ProviderError::NotFound(format!(
                "{} vanished after update",
                self.lifecycle.type_name()
            ))
        })?;
        self.delete().await?;
        Ok(updated)
    }
}

// =========================================================================
// Provider tester
// =========================================================================

/// A test harness for [`GitlabProvider`].
///
/// State is passed around as JSON, exactly as the orchestrating engine
/// would persist it between calls.
pub struct ProviderTester {
    provider: GitlabProvider,
    cancel: CancellationToken,
}

impl ProviderTester {
    /// Create a new tester for the given provider.
    pub fn new(provider: GitlabProvider) -> Self {
        Self {
            provider,
            cancel: CancellationToken::new(),
        }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &GitlabProvider {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .configure_with_env(config, |_| None)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub fn validate_resource_config(
        &self,
        resource_type: &str,
        config: &Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)?;
        check_diagnostics(diagnostics)
    }

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider.create(&self.cancel, resource_type, config).await
    }

    /// Read a resource. `None` means it no longer exists.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider
            .read(&self.cancel, resource_type, current_state)
            .await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(&self.cancel, resource_type, prior_state, config)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider
            .delete(&self.cancel, resource_type, current_state)
            .await
    }

    /// Import a resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<ImportedResource, ProviderError> {
        self.provider
            .import_resource(&self.cancel, resource_type, id)
            .await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(&self.cancel, data_source_type, config)
            .await
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.create(resource_type, initial_config).await?;
        let read_back = self.read(resource_type, created).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("{} vanished after create", resource_type))
        })?;

        let updated = self
            .update(resource_type, read_back, updated_config)
            .await?;
        let updated = self.read(resource_type, updated).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("{} vanished after update", resource_type))
        })?;

        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error whose summary or detail contains
/// the given substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics.iter().any(|d| {
        matches!(d.severity, DiagnosticSeverity::Error)
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    });

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that a state carries every named attribute.
///
/// # Panics
///
/// Panics listing the attributes that are missing.
pub fn assert_state_has_attributes<'a>(
    state: &StateMap,
    attributes: impl IntoIterator<Item = &'a str>,
) {
    let missing: Vec<&str> = attributes
        .into_iter()
        .filter(|attr| !state.contains(attr))
        .collect();

    assert!(
        missing.is_empty(),
        "Expected state to contain every attribute, missing: {:?}",
        missing
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: u64,
        name: String,
    }

    struct Widgets;

    impl Endpoint for Widgets {
        const KIND: &'static str = "widget";
        type Scope = String;
        type LeafId = u64;
        type Entity = Widget;
        type CreateRequest = String;
        type UpdateRequest = String;
    }

    impl Simulate for Widgets {
        fn create_entity(_scope: &String, leaf: u64, payload: &String) -> Widget {
            Widget {
                id: leaf,
                name: payload.clone(),
            }
        }

        fn update_entity(entity: &mut Widget, changes: &String) {
            entity.name = changes.clone();
        }
    }

    fn scope(name: &str) -> String {
        name.to_string()
    }

    #[tokio::test]
    async fn test_fake_remote_crud() {
        let api = FakeRemote::<Widgets>::new();
        let created = api.create(&scope("p"), "a".to_string()).await.unwrap();
        assert_eq!(created, Widget { id: 1, name: "a".into() });

        let updated = api.update(&scope("p"), 1, "b".to_string()).await.unwrap();
        assert_eq!(updated.name, "b");
        assert_eq!(api.update_payloads(), vec!["b".to_string()]);

        api.delete(&scope("p"), 1).await.unwrap();
        assert!(api.get(&scope("p"), 1).await.unwrap_err().is_not_found());
        assert_eq!(
            api.calls(),
            vec![Call::Create, Call::Update(1), Call::Delete(1), Call::Get(1)]
        );
    }

    #[tokio::test]
    async fn test_fake_remote_scopes_are_isolated() {
        let api = FakeRemote::<Widgets>::new();
        let leaf = api.seed(scope("p"), &"a".to_string());
        assert!(api.get(&scope("other"), leaf).await.unwrap_err().is_not_found());
        assert!(api.calls().len() == 1);
    }

    #[tokio::test]
    async fn test_fake_remote_paginates() {
        let api = FakeRemote::<Widgets>::new();
        for name in ["a", "b", "c"] {
            api.seed(scope("p"), &name.to_string());
        }
        api.seed(scope("q"), &"z".to_string());

        let first = api.list(&scope("p"), PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page, 2);

        let second = api.list(&scope("p"), PageRequest::new(2, 2)).await.unwrap();
        assert_eq!(second.items, vec![Widget { id: 3, name: "c".into() }]);
        assert!(second.is_last());
    }

    #[tokio::test]
    async fn test_fake_remote_failure_injection() {
        let api = FakeRemote::<Widgets>::new();
        api.fail_next(ProviderError::Remote("503".into()));
        let err = api.create(&scope("p"), "a".into()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(api.is_empty());
        assert!(api.create(&scope("p"), "a".into()).await.is_ok());
    }

    #[test]
    fn test_fake_remote_modify() {
        let api = FakeRemote::<Widgets>::new();
        let leaf = api.seed(scope("p"), &"a".to_string());
        api.modify(leaf, |w| w.name = "drifted".into()).unwrap();
        assert_eq!(api.entity(leaf).unwrap().name, "drifted");
        assert!(api.modify(99, |_| ()).unwrap_err().is_not_found());
        assert!(api.mutating_calls().is_empty());
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_has_errors() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_has_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration")
            .with_detail("client_key is required when client_cert is set")];
        assert_error_contains(&diagnostics, "Invalid");
        assert_error_contains(&diagnostics, "client_key");
    }

    #[test]
    fn test_assert_state_has_attributes() {
        let state = StateMap::new().with("id", "p:1").with("name", "a");
        assert_state_has_attributes(&state, ["id", "name"]);
    }

    #[test]
    #[should_panic(expected = "missing")]
    fn test_assert_state_has_attributes_fails() {
        let state = StateMap::new().with("id", "p:1");
        assert_state_has_attributes(&state, ["id", "created_at"]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![Diagnostic::error("Test error")
            .with_detail("Some detail")
            .with_attribute("name")]);
        let display = format!("{}", err);
        assert!(display.contains("Test error"));
        assert!(display.contains("Some detail"));
        assert!(display.contains("name"));

        let err = TestError::Provider(ProviderError::NotFound("not found".to_string()));
        let display = format!("{}", err);
        assert!(display.contains("not found"));
    }
}
