//! Accumulate-until-enough helpers for paged REST endpoints

use std::future::Future;

use actionarc_domain::Result;

/// One page from a cursor-paged endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the following page; `None` on the last page.
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetches offset pages until `k` items are collected or a page comes back
/// short.
///
/// `fetch(offset, limit)` is never asked for more than `page_size` items or
/// more than are still missing.
pub async fn get_k<T, F, Fut>(k: usize, page_size: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut items = Vec::with_capacity(k.min(page_size));

    while items.len() < k {
        let limit = page_size.min(k - items.len());
        let page = fetch(items.len(), limit).await?;
        let received = page.len();
        items.extend(page);
        if received < limit {
            break;
        }
    }

    items.truncate(k);
    Ok(items)
}

/// Follows cursors until `k` items are collected or there is no next page.
///
/// A cursor that repeats the previous one ends the walk.
pub async fn get_k_cursor<T, F, Fut>(k: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    while items.len() < k {
        let page = fetch(cursor.clone()).await?;
        items.extend(page.items);
        match page.next {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => break,
        }
    }

    items.truncate(k);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actionarc_domain::ActionArcError;

    use super::*;

    #[tokio::test]
    async fn offset_pages_stop_at_k() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let items = get_k(25, 10, move |offset, limit| {
            seen.lock().unwrap().push((offset, limit));
            async move { Ok((offset..offset + limit).collect::<Vec<_>>()) }
        })
        .await
        .unwrap();

        assert_eq!(items, (0..25).collect::<Vec<_>>());
        assert_eq!(*calls.lock().unwrap(), vec![(0, 10), (10, 10), (20, 5)]);
    }

    #[tokio::test]
    async fn offset_pages_stop_on_short_page() {
        let items = get_k(100, 20, |offset, limit| async move {
            let available = 30usize;
            let end = (offset + limit).min(available);
            Ok((offset..end).collect::<Vec<_>>())
        })
        .await
        .unwrap();
        assert_eq!(items.len(), 30);
    }

    #[tokio::test]
    async fn cursor_pages_follow_next_until_exhausted() {
        let items = get_k_cursor(10, |cursor| async move {
            Ok(match cursor.as_deref() {
                None => Page::new(vec![1, 2], Some("b".to_string())),
                Some("b") => Page::new(vec![3, 4], Some("c".to_string())),
                _ => Page::last(vec![5]),
            })
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn cursor_pages_truncate_and_stop_on_repeat() {
        let items = get_k_cursor(3, |_| async { Ok(Page::new(vec![1, 2], Some("same".into()))) })
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 1]);

        let looped = get_k_cursor(100, |_| async { Ok(Page::new(vec![7], Some("same".into()))) })
            .await
            .unwrap();
        assert_eq!(looped, vec![7, 7]);
    }

    #[tokio::test]
    async fn huge_k_allocates_per_page() {
        let items: Vec<u64> = get_k(usize::MAX, 50, |_, _| async { Ok(vec![]) }).await.unwrap();
        assert!(items.is_empty());

        let items = get_k(usize::MAX, 3, |offset, limit| async move {
            Ok(if offset < 6 { (offset..offset + limit).collect::<Vec<_>>() } else { vec![] })
        })
        .await
        .unwrap();
        assert_eq!(items, (0..6).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn errors_propagate() {
        let result: Result<Vec<u8>> =
            get_k(5, 5, |_, _| async { Err(ActionArcError::Network("down".into())) }).await;
        assert!(result.is_err());
    }
}
