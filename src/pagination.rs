//! Walking paginated listings.
//!
//! Both walkers start at `first`, follow [`Page::next_page`] and stop at the
//! `0` sentinel. A cursor pointing back at a page already visited is an
//! error. A [`ProviderError::NotFound`] on the first page means the scope has
//! no children and yields an empty result. On any later page it is a hard
//! error, like every other failure, and the items gathered so far are
//! dropped.

use std::collections::HashSet;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::cancellable;
use crate::error::ProviderError;
use crate::remote::{Page, PageRequest};

/// Collect every item of a paginated listing in order.
///
/// # Example
///
/// ```
/// use hemmer_provider_gitlab::pagination::collect_pages;
/// use hemmer_provider_gitlab::remote::{Page, PageRequest};
/// use hemmer_provider_gitlab::ProviderError;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let token = CancellationToken::new();
/// let items = collect_pages(&token, PageRequest::first(2), |request| async move {
///     Ok::<_, ProviderError>(match request.page {
///         1 => Page::new(vec!["a", "b"], 2),
///         _ => Page::last(vec!["c"]),
///     })
/// })
/// .await
/// .unwrap();
/// assert_eq!(items, vec!["a", "b", "c"]);
/// # });
/// ```
pub async fn collect_pages<T, F, Fut>(
    cancel: &CancellationToken,
    first: PageRequest,
    mut fetch: F,
) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    walk(cancel, first, &mut fetch, |page| {
        items.extend(page);
        false
    })
    .await?;
    Ok(items)
}

/// Walk a paginated listing until `predicate` matches an item.
///
/// Pages after the match are not fetched.
pub async fn find_in_pages<T, F, Fut, P>(
    cancel: &CancellationToken,
    first: PageRequest,
    mut fetch: F,
    mut predicate: P,
) -> Result<Option<T>, ProviderError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
    P: FnMut(&T) -> bool,
{
    let mut found = None;
    walk(cancel, first, &mut fetch, |page| {
        found = page.into_iter().find(|item| predicate(item));
        found.is_some()
    })
    .await?;
    Ok(found)
}

/// Drive the page loop. `sink` returns true to stop early.
async fn walk<T, F, Fut, S>(
    cancel: &CancellationToken,
    first: PageRequest,
    fetch: &mut F,
    mut sink: S,
) -> Result<(), ProviderError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
    S: FnMut(Vec<T>) -> bool,
{
    let mut request = first;
    let mut first_call = true;
    let mut visited = HashSet::from([first.page]);

    loop {
        debug!(page = request.page, per_page = request.per_page, "Fetching page");
        let page = match cancellable(cancel, "list", fetch(request)).await {
            Ok(page) => page,
            Err(e) if first_call && e.is_not_found() => {
                warn!(page = request.page, "First page not found, treating as empty");
                return Ok(());
            },
            Err(e) => return Err(e),
        };
        first_call = false;

        let next_page = page.next_page;
        if sink(page.items) || next_page == 0 {
            return Ok(());
        }
        if !visited.insert(next_page) {
            return Err(ProviderError::Remote(format!(
                "pagination revisited page {} after page {}",
                next_page, request.page
            )));
        }
        request = request.at(next_page);
    }
}
