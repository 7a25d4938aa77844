//! Integration tests for azure_data_cosmos.
//!
//! These tests require a live Cosmos DB account with Entra ID data-plane
//! access for the signed-in identity.
//! Run with: `cargo test --features integration-tests`
//!
//! Required environment variables:
//! - `AZURE_COSMOS_ENDPOINT`: The account endpoint, e.g. `https://acct.documents.azure.com`
//! - `AZURE_DATA_TOKEN` or an Azure CLI login

#![cfg(feature = "integration-tests")]

use azure_data_core::auth::ServiceCredential;
use azure_data_core::client::ServiceClient;
use azure_data_core::feed::FeedOptions;
use azure_data_cosmos::query::{Query, QueryOptions};
use azure_data_cosmos::{container, database, document, query};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    id: String,
    category: String,
}

fn get_client() -> ServiceClient {
    let endpoint =
        std::env::var("AZURE_COSMOS_ENDPOINT").expect("AZURE_COSMOS_ENDPOINT not set");

    azure_data_cosmos::client_builder()
        .endpoint(endpoint)
        .credential(ServiceCredential::from_env().expect("credential"))
        .build()
        .expect("Failed to build client")
}

fn get_database() -> String {
    std::env::var("AZURE_COSMOS_DATABASE").unwrap_or_else(|_| "sdk-tests".to_string())
}

fn get_container() -> String {
    std::env::var("AZURE_COSMOS_CONTAINER").unwrap_or_else(|_| "items".to_string())
}

#[tokio::test]
async fn test_list_databases() {
    let client = get_client();

    let databases = database::list(&client, FeedOptions::new().max_item_count(1))
        .expect("feed")
        .collect_all()
        .await
        .expect("list databases");
    assert!(databases.iter().any(|db| db.id == get_database()));
}

#[tokio::test]
async fn test_container_metadata() {
    let client = get_client();

    let container = container::get(&client, &get_database(), &get_container())
        .await
        .expect("get container");
    assert!(container.partition_key.is_some());
}

#[tokio::test]
async fn test_document_lifecycle_and_paged_query() {
    let client = get_client();
    let db = get_database();
    let coll = get_container();

    // Write enough documents to span several one-item pages
    for i in 0..3 {
        let item = Item {
            id: format!("it-{i}"),
            category: "integration".into(),
        };
        document::upsert(&client, &db, &coll, "integration", &item)
            .await
            .expect("upsert");
    }

    let query = Query::builder()
        .text("SELECT * FROM c WHERE c.category = @category")
        .parameter("@category", "integration")
        .build()
        .expect("valid query");
    let options = QueryOptions::new()
        .partition_key("integration")
        .feed(FeedOptions::new().max_item_count(1));

    let mut feed =
        query::query_documents::<Item>(&client, &db, &coll, &query, options).expect("feed");
    let mut pages = 0;
    let mut items = Vec::new();
    while let Some(page) = feed.next_page().await {
        let page = page.expect("page");
        pages += 1;
        items.extend(page.into_items());
    }
    assert!(pages >= 3);
    assert_eq!(items.len(), 3);

    for item in items {
        document::delete(&client, &db, &coll, &item.id, "integration")
            .await
            .expect("delete");
    }
}
