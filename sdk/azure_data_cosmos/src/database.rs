//! Database operations for Cosmos DB.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_data_core::client::ServiceClient;
//! use azure_data_core::feed::FeedOptions;
//! use azure_data_cosmos::database;
//!
//! # async fn example(client: &ServiceClient) -> azure_data_core::error::SdkResult<()> {
//! let created = database::create(client, "inventory").await?;
//! println!("created {}", created.id);
//!
//! let names: Vec<String> = database::list(client, FeedOptions::default())?
//!     .collect_all()
//!     .await?
//!     .into_iter()
//!     .map(|db| db.id)
//!     .collect();
//! println!("{names:?}");
//! # Ok(())
//! # }
//! ```

use azure_data_core::client::ServiceClient;
use azure_data_core::error::SdkResult;
use azure_data_core::feed::{FeedIterator, FeedOptions};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::executor::CosmosFeedExecutor;
use crate::models::{request_headers, SystemProperties};

/// A Cosmos DB database.
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    /// User-assigned name.
    pub id: String,

    /// Relative link to the database's containers.
    #[serde(rename = "_colls", default)]
    pub colls_link: Option<String>,

    /// Service-assigned properties.
    #[serde(flatten)]
    pub system: SystemProperties,
}

#[derive(Debug, Serialize)]
struct DatabaseCreateRequest<'a> {
    id: &'a str,
}

/// Iterator over every database in the account.
pub type DatabaseFeed = FeedIterator<Database, CosmosFeedExecutor<Database>>;

/// List the databases in the account.
///
/// Nothing is sent until the returned feed is polled.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::databases::list`.
#[tracing::instrument(name = "azure::cosmos::databases::list", skip(client, options))]
pub fn list(client: &ServiceClient, options: FeedOptions) -> SdkResult<DatabaseFeed> {
    let url = client.segments_url(&["dbs"])?;
    tracing::debug!("creating database feed");
    Ok(FeedIterator::with_options(
        CosmosFeedExecutor::read_feed(client, url),
        options,
    ))
}

/// Get a database by id.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::databases::get` with field `database`.
#[tracing::instrument(name = "azure::cosmos::databases::get", skip(client), fields(database = %id))]
pub async fn get(client: &ServiceClient, id: &str) -> SdkResult<Database> {
    tracing::debug!("getting database");

    let url = client.segments_url(&["dbs", id])?;
    let response = client
        .send(Method::GET, url.as_str(), request_headers()?, None)
        .await?;
    Ok(response.json::<Database>().await?)
}

/// Create a database.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::databases::create` with field `database`.
#[tracing::instrument(name = "azure::cosmos::databases::create", skip(client), fields(database = %id))]
pub async fn create(client: &ServiceClient, id: &str) -> SdkResult<Database> {
    tracing::debug!("creating database");

    let url = client.segments_url(&["dbs"])?;
    let body = serde_json::to_value(DatabaseCreateRequest { id })?;
    let response = client
        .send(Method::POST, url.as_str(), request_headers()?, Some(&body))
        .await?;
    let database = response.json::<Database>().await?;

    tracing::debug!(rid = ?database.system.rid, "database created");
    Ok(database)
}

/// Delete a database and everything in it.
///
/// # Tracing
///
/// Emits a span named `azure::cosmos::databases::delete` with field `database`.
#[tracing::instrument(name = "azure::cosmos::databases::delete", skip(client), fields(database = %id))]
pub async fn delete(client: &ServiceClient, id: &str) -> SdkResult<()> {
    tracing::debug!("deleting database");

    let url = client.segments_url(&["dbs", id])?;
    client
        .send(Method::DELETE, url.as_str(), request_headers()?, None)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_mock_client, TEST_TIMESTAMP};
    use azure_data_core::SdkError;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn database_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "_rid": "Wx1AAA==",
            "_self": "dbs/Wx1AAA==/",
            "_etag": "\"00000a00-0000-0000-0000-000000000000\"",
            "_colls": "colls/",
            "_users": "users/",
            "_ts": TEST_TIMESTAMP
        })
    }

    #[test]
    fn database_deserialization() {
        let db: Database = serde_json::from_value(database_json("db1")).unwrap();
        assert_eq!(db.id, "db1");
        assert_eq!(db.colls_link.as_deref(), Some("colls/"));
        assert_eq!(db.system.ts, Some(TEST_TIMESTAMP));
    }

    #[tokio::test]
    async fn list_databases_follows_continuation() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dbs"))
            .and(wiremock::matchers::header("x-ms-continuation", "next-dbs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_rid": "",
                "Databases": [database_json("db3")],
                "_count": 1
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/dbs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-ms-continuation", "next-dbs")
                    .set_body_json(serde_json::json!({
                        "_rid": "",
                        "Databases": [database_json("db1"), database_json("db2")],
                        "_count": 2
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let mut feed = list(&client, FeedOptions::default()).expect("feed");
        let ids: Vec<String> = feed
            .collect_all()
            .await
            .expect("should succeed")
            .into_iter()
            .map(|db| db.id)
            .collect();

        assert_eq!(ids, vec!["db1", "db2", "db3"]);
    }

    #[tokio::test]
    async fn list_is_lazy() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let feed = list(&client, FeedOptions::default()).expect("feed");
        assert!(!feed.is_exhausted());
    }

    #[tokio::test]
    async fn create_database_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dbs"))
            .and(header_exists("x-ms-date"))
            .and(body_json(serde_json::json!({"id": "inventory"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(database_json("inventory")))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let db = create(&client, "inventory").await.expect("should succeed");
        assert_eq!(db.id, "inventory");
    }

    #[tokio::test]
    async fn create_existing_database_conflicts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dbs"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "Conflict",
                "message": "Entity with the specified id already exists in the system."
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        match create(&client, "inventory").await.unwrap_err() {
            SdkError::Api { code, .. } => assert_eq!(code, "Conflict"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_and_delete_database() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dbs/db1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(database_json("db1")))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/dbs/db1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        assert_eq!(get(&client, "db1").await.expect("get").id, "db1");
        delete(&client, "db1").await.expect("delete");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn get_emits_span_with_database_field() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dbs/traced"))
            .respond_with(ResponseTemplate::new(200).set_body_json(database_json("traced")))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let _ = get(&client, "traced").await;

        assert!(logs_contain("azure::cosmos::databases::get"));
        assert!(logs_contain("database=traced"));
    }
}
