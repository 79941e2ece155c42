use mockito::Matcher;
use nutriscan::autocomplete::{Autocomplete, AutocompleteOptions, Key, KeyOutcome};
use nutriscan::config::NutritionixConfig;
use nutriscan::{AnalysisError, FoodSearch, NutritionixClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn config_for(server: &mockito::Server) -> NutritionixConfig {
    NutritionixConfig {
        app_id: Some("app-id".to_string()),
        app_key: Some("app-key".to_string()),
        base_url: server.url(),
        max_suggestions: 3,
        ..Default::default()
    }
}

fn apple_results() -> String {
    json!({
        "common": [
            { "food_name": "apple", "serving_qty": 1, "serving_unit": "medium", "tag_id": "384" },
            { "food_name": "apple juice", "serving_qty": 1, "serving_unit": "cup" }
        ],
        "branded": [
            { "food_name": "Apple Pie", "brand_name_item_name": "Mott's Apple Pie", "brand_name": "Mott's", "serving_qty": 0.5, "serving_unit": "slice" },
            { "food_name": "Apple Chips", "brand_name": "Bare" }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_instant_search_orders_common_before_branded() {
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".to_string(), "apple".to_string()),
            Matcher::UrlEncoded("detailed".to_string(), "true".to_string()),
        ]))
        .match_header("x-app-id", "app-id")
        .match_header("x-app-key", "app-key")
        .match_header("x-remote-user-id", "0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(apple_results())
        .expect(1)
        .create_async()
        .await;

    let client = NutritionixClient::new(&config_for(&server), None).unwrap();
    let suggestions = client.search("apple").await.unwrap();

    let names: Vec<&str> = suggestions.iter().map(|s| s.display_name()).collect();
    assert_eq!(names, vec!["apple", "apple juice", "Apple Pie"]);
    assert_eq!(suggestions[2].serving_details().as_deref(), Some("0.5 slice"));
    m.assert_async().await;
}

#[tokio::test]
async fn test_unauthorised_search_is_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message": "unauthorized"}"#)
        .create_async()
        .await;

    let client = NutritionixClient::new(&config_for(&server), None).unwrap();
    let err = client.search("apple").await.unwrap_err();

    match err {
        AnalysisError::Upstream { status, message } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Failed to fetch food suggestions");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_body_without_result_lists_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"foods": []}"#)
        .create_async()
        .await;

    let client = NutritionixClient::new(&config_for(&server), None).unwrap();
    let err = client.search("apple").await.unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_typing_burst_sends_one_request() {
    let mut server = mockito::Server::new_async().await;
    let apple = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::UrlEncoded("query".to_string(), "apple".to_string()))
        .with_status(200)
        .with_body(apple_results())
        .expect(1)
        .create_async()
        .await;
    let partial = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::Regex("query=ap(&|p&|pl&)".to_string()))
        .expect(0)
        .create_async()
        .await;

    let client = Arc::new(NutritionixClient::new(&config_for(&server), None).unwrap());
    let mut autocomplete = Autocomplete::new(
        client,
        AutocompleteOptions {
            debounce: Duration::from_millis(50),
            min_query_len: 2,
        },
    );

    for text in ["a", "ap", "app", "appl", "apple"] {
        autocomplete.on_input(text);
    }
    autocomplete.settle().await;

    let state = autocomplete.state();
    assert!(state.visible);
    assert_eq!(state.suggestions.len(), 3);

    assert_eq!(autocomplete.on_key(Key::ArrowDown), KeyOutcome::Highlighted(0));
    assert_eq!(autocomplete.on_key(Key::ArrowUp), KeyOutcome::Highlighted(2));
    assert_eq!(
        autocomplete.on_key(Key::Enter),
        KeyOutcome::Committed("Apple Pie".to_string())
    );
    assert_eq!(autocomplete.state().query, "Apple Pie");
    assert!(!autocomplete.state().visible);

    apple.assert_async().await;
    partial.assert_async().await;
}

#[tokio::test]
async fn test_failed_search_shows_no_suggestions() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/v2/search/instant")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = Arc::new(NutritionixClient::new(&config_for(&server), None).unwrap());
    let mut autocomplete = Autocomplete::new(
        client,
        AutocompleteOptions {
            debounce: Duration::from_millis(10),
            min_query_len: 2,
        },
    );

    autocomplete.on_input("banana");
    autocomplete.settle().await;

    let state = autocomplete.state();
    assert!(state.suggestions.is_empty());
    assert!(!state.visible);
    assert_eq!(autocomplete.on_key(Key::ArrowDown), KeyOutcome::Ignored);
}
