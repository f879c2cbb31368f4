mod common;

use bamctl::api::Params;
use bamctl::error::BamError;
use bamctl::lister::{DEFAULT_PAGE_SIZE, get_all_entities, list_all};
use common::{FakeBam, network, sentinel};
use serde_json::Value;

/// Backend whose `getEntities` pages have the given lengths, then are empty
fn paged_backend(page_sizes: Vec<usize>) -> FakeBam {
    FakeBam::new(move |operation, params| {
        assert_eq!(operation, "getEntities");
        let start: usize = params.get("start").unwrap().parse().unwrap();
        let count: usize = params.get("count").unwrap().parse().unwrap();
        let page = start / count;
        let len = page_sizes.get(page).copied().unwrap_or(0);
        Ok(Value::Array(
            (0..len)
                .map(|i| network((start + i + 1) as u64, "10.0.0.0/24"))
                .collect(),
        ))
    })
}

#[tokio::test]
async fn test_short_last_page_ends_listing() {
    let api = paged_backend(vec![1000, 1000, 400]);

    let all = get_all_entities(&api, 5, "IP4Network").await.unwrap();
    assert_eq!(all.len(), 2400);
    assert_eq!(all.first().unwrap().id, 1);
    assert_eq!(all.last().unwrap().id, 2400);
    assert!(all.windows(2).all(|w| w[0].id + 1 == w[1].id));

    let calls = api.calls();
    assert_eq!(calls.len(), 3);
    let starts: Vec<&str> = calls.iter().map(|c| c.param("start").unwrap()).collect();
    assert_eq!(starts, vec!["0", "1000", "2000"]);
    assert!(calls.iter().all(|c| c.param("count") == Some("1000")));
    assert!(calls.iter().all(|c| c.param("parentId") == Some("5")));
}

#[tokio::test]
async fn test_exact_multiple_costs_one_empty_page() {
    let api = paged_backend(vec![1000, 1000, 1000]);

    let all = get_all_entities(&api, 5, "IP4Network").await.unwrap();
    assert_eq!(all.len(), 3000);
    assert_eq!(api.calls().len(), 4);
}

#[tokio::test]
async fn test_empty_first_page() {
    let api = paged_backend(vec![]);

    let all = get_all_entities(&api, 5, "DHCP4Range").await.unwrap();
    assert!(all.is_empty());
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn test_default_page_size_when_count_missing() {
    let api = paged_backend(vec![DEFAULT_PAGE_SIZE, 3]);

    let params = Params::new().set("parentId", 5).set("type", "IP4Network");
    let all = list_all(&api, "getEntities", params).await.unwrap();
    assert_eq!(all.len(), DEFAULT_PAGE_SIZE + 3);

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].param("count"), Some("1000"));
    assert_eq!(calls[0].param("start"), Some("0"));
}

#[tokio::test]
async fn test_custom_page_size() {
    let api = paged_backend(vec![2, 2, 1]);

    let params = Params::new()
        .set("parentId", 5)
        .set("type", "IP4Network")
        .set("start", 0)
        .set("count", 2);
    let all = list_all(&api, "getEntities", params).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(api.calls().len(), 3);
}

#[tokio::test]
async fn test_sentinel_entries_do_not_end_paging() {
    // A full page with one sentinel still means there may be more
    let api = FakeBam::new(|_, params| {
        let start = params.get("start").unwrap();
        Ok(match start {
            "0" => Value::Array(vec![network(1, "10.0.1.0/24"), sentinel()]),
            "2" => Value::Array(vec![network(3, "10.0.3.0/24")]),
            _ => Value::Array(vec![]),
        })
    });

    let params = Params::new().set("parentId", 5).set("count", 2);
    let all = list_all(&api, "getEntities", params).await.unwrap();
    let ids: Vec<u64> = all.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test]
async fn test_failed_page_fails_listing() {
    let api = FakeBam::new(|_, params| match params.get("start") {
        Some("0") => Ok(Value::Array(
            (1..=1000).map(|id| network(id, "10.0.0.0/24")).collect(),
        )),
        _ => Err(BamError::Transport("connection reset".to_string())),
    });

    let err = get_all_entities(&api, 5, "IP4Network").await.unwrap_err();
    assert!(matches!(err, BamError::Transport(_)));
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test]
async fn test_non_list_response_is_rejected() {
    let api = FakeBam::new(|_, _| Ok(Value::from(42)));

    let err = get_all_entities(&api, 5, "IP4Network").await.unwrap_err();
    assert!(matches!(err, BamError::InvalidResponse { .. }));
}
