use super::{ObjectStore, StoreError};
use crate::azure::{AzureError, SharedKeyClient, append_segments};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use url::Url;

/// A blob container in an Azure Storage account. Objects are block blobs.
pub struct AzureBlobStore {
    client: SharedKeyClient,
    container_url: Url,
}

impl AzureBlobStore {
    pub fn new(client: SharedKeyClient, container: &str) -> Result<Self, AzureError> {
        let container_url = append_segments(&client.account().blob_endpoint, &[container])?;
        Ok(AzureBlobStore {
            client,
            container_url,
        })
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn ensure_container_exists(&self) -> Result<(), StoreError> {
        let mut url = self.container_url.clone();
        url.query_pairs_mut().append_pair("restype", "container");

        let response = self
            .client
            .send(Method::PUT, url, HeaderMap::new(), Bytes::new())
            .await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::CONFLICT => Ok(()),
            _ => Err(AzureError::from_response(&response).into()),
        }
    }

    async fn put(&self, name: &str, body: Bytes, overwrite: bool) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let url = append_segments(&self.container_url, &[name])?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if !overwrite {
            headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        }

        let response = self.client.send(Method::PUT, url, headers, body).await?;
        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED if !overwrite => {
                Err(StoreError::AlreadyExists(name.to_string()))
            }
            _ => Err(AzureError::from_response(&response).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockStorageServer;

    #[tokio::test]
    async fn test_blob_requests() {
        let server = MockStorageServer::start().await;
        server.respond(Method::PUT, StatusCode::CREATED, "");

        let store = AzureBlobStore::new(server.client(), "outbound").unwrap();
        store.ensure_container_exists().await.unwrap();
        store
            .put("X_20240305_070809.txt", Bytes::from("X,Alice,30"), true)
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/devstoreaccount1/outbound");
        assert_eq!(requests[0].query.as_deref(), Some("restype=container"));

        let put = &requests[1];
        assert_eq!(put.path, "/devstoreaccount1/outbound/X_20240305_070809.txt");
        assert_eq!(put.body, Bytes::from("X,Alice,30"));
        assert_eq!(put.headers["x-ms-blob-type"], "BlockBlob");
        assert_eq!(put.headers["content-length"], "10");
        assert!(put.headers.get(IF_NONE_MATCH).is_none());
    }

    #[tokio::test]
    async fn test_existing_container_and_blob() {
        let server = MockStorageServer::start().await;
        server.respond_with_code(Method::PUT, StatusCode::CONFLICT, "BlobAlreadyExists");

        let store = AzureBlobStore::new(server.client(), "outbound").unwrap();
        // Container already exists
        store.ensure_container_exists().await.unwrap();

        assert!(matches!(
            store.put("a.txt", Bytes::from("x"), false).await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(server.requests()[1].headers[IF_NONE_MATCH], "*");
    }
}
