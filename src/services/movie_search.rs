use crate::{error::AppResult, models::SearchResponse, services::providers::MovieSearcher};
use std::sync::Arc;

/// Lenient page parsing: absent, non-numeric or < 1 all mean page 1
pub fn parse_page(page: Option<&str>) -> u32 {
    page.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Service function for movie search
///
/// Delegates to the configured MovieSearcher, keeping HTTP routing free of
/// catalog details.
pub async fn search_movies(
    searcher: Arc<dyn MovieSearcher>,
    query: &str,
    page: Option<&str>,
) -> AppResult<SearchResponse> {
    let page = parse_page(page);
    tracing::debug!(query = %query, page, provider = searcher.name(), "Searching movies");
    searcher.search(query, page).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_defaults() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
    }

    #[test]
    fn test_parse_page_valid() {
        assert_eq!(parse_page(Some("1")), 1);
        assert_eq!(parse_page(Some(" 7 ")), 7);
    }
}
