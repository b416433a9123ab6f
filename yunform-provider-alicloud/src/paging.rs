//! Pagination loops shared by data sources and list-based lookups

use std::future::Future;

use serde_json::Value as Json;

use crate::error::AlicloudResult;

/// Request `PageNumber` 1, 2, ... until a page comes back shorter than
/// `page_size`.
pub async fn paginate_pages<F, Fut>(page_size: usize, mut fetch: F) -> AlicloudResult<Vec<Json>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = AlicloudResult<Vec<Json>>>,
{
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        let items = fetch(page).await?;
        let count = items.len();
        all.extend(items);
        if count < page_size {
            break;
        }
        page += 1;
    }

    log::debug!("collected {} items over {} pages", all.len(), page);
    Ok(all)
}

/// Follow `NextToken` until the API returns none, or repeats the token it
/// was just given
pub async fn paginate_tokens<F, Fut>(mut fetch: F) -> AlicloudResult<Vec<Json>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = AlicloudResult<(Vec<Json>, Option<String>)>>,
{
    let mut all = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let (items, next) = fetch(token.clone()).await?;
        all.extend(items);
        match next.filter(|t| !t.is_empty()) {
            Some(next) if token.as_ref() == Some(&next) => {
                log::warn!("NextToken {} returned twice, stopping pagination", next);
                break;
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(all)
}
