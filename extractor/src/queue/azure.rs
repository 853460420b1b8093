use super::{MessageQueue, QueueError, RECEIVE_VISIBILITY};
use crate::azure::{AzureError, SharedKeyClient, append_segments, error_code};
use crate::types::{LeaseHandle, QueueMessage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Deserialize, Debug, Default)]
struct QueueMessagesList {
    #[serde(rename = "QueueMessage", default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct WireMessage {
    message_id: String,
    pop_receipt: String,
    #[serde(default)]
    insertion_time: Option<String>,
    #[serde(default)]
    message_text: String,
}

impl WireMessage {
    fn into_queue_message(self, now: DateTime<Utc>) -> QueueMessage {
        let approximate_age = self
            .insertion_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc2822(t).ok())
            .and_then(|inserted| (now - inserted.with_timezone(&Utc)).to_std().ok())
            .unwrap_or_default();

        QueueMessage {
            handle: LeaseHandle::new(self.message_id, self.pop_receipt),
            raw_body: Bytes::from(self.message_text),
            approximate_age,
        }
    }
}

fn parse_messages(xml: &str) -> Result<QueueMessagesList, AzureError> {
    // The service may prefix the document with a byte order mark
    let xml = xml.trim_start_matches('\u{feff}').trim();
    if xml.is_empty() {
        return Ok(QueueMessagesList::default());
    }
    Ok(quick_xml::de::from_str(xml)?)
}

/// A queue in an Azure Storage account.
pub struct AzureQueue {
    client: SharedKeyClient,
    queue_url: Url,
}

impl AzureQueue {
    pub fn new(client: SharedKeyClient, queue_name: &str) -> Result<Self, AzureError> {
        let queue_url = append_segments(&client.account().queue_endpoint, &[queue_name])?;
        Ok(AzureQueue { client, queue_url })
    }

    fn message_url(&self, handle: &LeaseHandle) -> Result<Url, AzureError> {
        let mut url = append_segments(&self.queue_url, &["messages", handle.id()])?;
        url.query_pairs_mut()
            .append_pair("popreceipt", handle.lease_token());
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, AzureError> {
        self.client
            .send(method, url, HeaderMap::new(), Bytes::new())
            .await
    }
}

/// 404 means the message is gone, 400 with `PopReceiptMismatch` means another
/// consumer holds a newer lease. Either way this scan lost the message.
fn lease_error(response: &reqwest::Response, handle: &LeaseHandle) -> QueueError {
    let status = response.status();
    let mismatch = status == StatusCode::BAD_REQUEST
        && error_code(response) == Some("PopReceiptMismatch");

    if status == StatusCode::NOT_FOUND || mismatch {
        QueueError::LeaseLost(handle.id().to_string())
    } else {
        AzureError::from_response(response).into()
    }
}

#[async_trait]
impl MessageQueue for AzureQueue {
    async fn ensure_exists(&self) -> Result<(), QueueError> {
        let response = self.send(Method::PUT, self.queue_url.clone()).await?;
        match response.status() {
            // 409 is returned when the queue exists with different metadata
            StatusCode::CREATED | StatusCode::NO_CONTENT | StatusCode::CONFLICT => Ok(()),
            _ => Err(AzureError::from_response(&response).into()),
        }
    }

    async fn receive_page(&self, max_count: u8) -> Result<Vec<QueueMessage>, QueueError> {
        let mut url = append_segments(&self.queue_url, &["messages"])?;
        url.query_pairs_mut()
            .append_pair("numofmessages", &max_count.to_string())
            .append_pair(
                "visibilitytimeout",
                &RECEIVE_VISIBILITY.as_secs().to_string(),
            );

        let response = self.send(Method::GET, url).await?;
        if response.status() != StatusCode::OK {
            return Err(AzureError::from_response(&response).into());
        }

        let body = response.text().await.map_err(AzureError::from)?;
        let now = Utc::now();
        Ok(parse_messages(&body)?
            .messages
            .into_iter()
            .map(|m| m.into_queue_message(now))
            .collect())
    }

    async fn delete(&self, handle: LeaseHandle) -> Result<(), QueueError> {
        let response = self.send(Method::DELETE, self.message_url(&handle)?).await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(lease_error(&response, &handle)),
        }
    }

    async fn update_visibility(
        &self,
        handle: LeaseHandle,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let mut url = self.message_url(&handle)?;
        url.query_pairs_mut()
            .append_pair("visibilitytimeout", &delay.as_secs().to_string());

        let response = self.send(Method::PUT, url).await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(lease_error(&response, &handle)),
        }
    }
}
