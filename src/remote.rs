//! The remote API seam.
//!
//! The reconciliation engine never talks HTTP. It calls a [`RemoteApi`]
//! implementation for one [`Endpoint`], and that implementation is expected to
//! report a missing entity as [`ProviderError::NotFound`] and every other
//! failure as [`ProviderError::Remote`].

use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Default number of items requested per page.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// The types exchanged with one family of REST endpoints.
pub trait Endpoint: Send + Sync + 'static {
    /// Human readable label used in log events and error messages.
    const KIND: &'static str;

    /// Parent context needed to address an entity, e.g. the project.
    type Scope: Clone + Debug + PartialEq + Send + Sync;

    /// The innermost id of an entity within its scope.
    type LeafId: Copy + Debug + Display + PartialEq + Send + Sync;

    /// A remote record as returned by the API.
    type Entity: Clone + Debug + Send + Sync;

    /// Payload for creating an entity.
    type CreateRequest: Clone + Debug + Send + Sync;

    /// Payload for a partial update. Unset fields are left untouched remotely.
    type UpdateRequest: Clone + Debug + Send + Sync;
}

/// Client for the endpoints of `E`.
#[async_trait]
pub trait RemoteApi<E: Endpoint>: Send + Sync {
    /// Create an entity in `scope`.
    async fn create(
        &self,
        scope: &E::Scope,
        payload: E::CreateRequest,
    ) -> Result<E::Entity, ProviderError>;

    /// Fetch one entity.
    async fn get(&self, scope: &E::Scope, leaf: E::LeafId) -> Result<E::Entity, ProviderError>;

    /// Apply a partial update.
    async fn update(
        &self,
        scope: &E::Scope,
        leaf: E::LeafId,
        changes: E::UpdateRequest,
    ) -> Result<E::Entity, ProviderError>;

    /// Delete one entity.
    async fn delete(&self, scope: &E::Scope, leaf: E::LeafId) -> Result<(), ProviderError>;

    /// Fetch one page of the entities in `scope`.
    async fn list(
        &self,
        scope: &E::Scope,
        page: PageRequest,
    ) -> Result<Page<E::Entity>, ProviderError>;
}

/// Which page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// One-based page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl PageRequest {
    /// Create a page request.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// The first page with `per_page` items.
    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page)
    }

    /// The same page size at another page number.
    pub fn at(self, page: u32) -> Self {
        Self { page, ..self }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PER_PAGE)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// The next page number, or `0` when this is the last page.
    pub next_page: u32,
}

impl<T> Page<T> {
    /// A page followed by `next_page`.
    pub fn new(items: Vec<T>, next_page: u32) -> Self {
        Self { items, next_page }
    }

    /// The final page.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, 0)
    }

    /// Whether no page follows.
    pub fn is_last(&self) -> bool {
        self.next_page == 0
    }
}
