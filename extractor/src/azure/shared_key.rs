use super::{AzureError, StorageAccount};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap,
    HeaderName, HeaderValue, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE,
    RANGE,
};
use reqwest::{Method, Request};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

const STORAGE_VERSION: &str = "2021-12-02";
const CONTENT_MD5: &str = "content-md5";

/// HTTP client that signs every request with the account's shared key.
#[derive(Clone, Debug)]
pub struct SharedKeyClient {
    http: reqwest::Client,
    account: Arc<StorageAccount>,
}

impl SharedKeyClient {
    pub fn new(account: StorageAccount) -> Self {
        SharedKeyClient {
            http: reqwest::Client::new(),
            account: Arc::new(account),
        }
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, AzureError> {
        let content_length = body.len();
        let mut request = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .build()?;

        self.authorize(&mut request, content_length, Utc::now())?;

        Ok(self.http.execute(request).await?)
    }

    fn authorize(
        &self,
        request: &mut Request,
        content_length: usize,
        now: DateTime<Utc>,
    ) -> Result<(), AzureError> {
        let headers = request.headers_mut();
        headers.insert("x-ms-date", HeaderValue::from_str(&rfc1123(now))?);
        headers.insert("x-ms-version", HeaderValue::from_static(STORAGE_VERSION));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

        let string_to_sign = string_to_sign(&self.account.name, request);
        let signature = self.account.sign(&string_to_sign);
        let authorization = format!("SharedKey {}:{}", self.account.name, signature);
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
        Ok(())
    }
}

fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Shared Key string to sign for the blob and queue services.
///
/// The `Date` line is left empty because `x-ms-date` is always sent, and a
/// zero `Content-Length` is signed as the empty string.
fn string_to_sign(account_name: &str, request: &Request) -> String {
    let headers = request.headers();
    let content_length = match header(headers, &CONTENT_LENGTH) {
        "0" => "",
        length => length,
    };

    let standard = [
        request.method().as_str(),
        header(headers, &CONTENT_ENCODING),
        header(headers, &CONTENT_LANGUAGE),
        content_length,
        header(headers, &HeaderName::from_static(CONTENT_MD5)),
        header(headers, &CONTENT_TYPE),
        "",
        header(headers, &IF_MODIFIED_SINCE),
        header(headers, &IF_MATCH),
        header(headers, &IF_NONE_MATCH),
        header(headers, &IF_UNMODIFIED_SINCE),
        header(headers, &RANGE),
    ];

    let mut out = standard.join("\n");
    out.push('\n');
    out.push_str(&canonicalized_headers(headers));
    out.push_str(&canonicalized_resource(account_name, request.url()));
    out
}

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        // Header names are already lowercase
        if name.as_str().starts_with("x-ms-") {
            ms_headers
                .entry(name.as_str())
                .or_default()
                .push(value.to_str().unwrap_or("").trim());
        }
    }

    ms_headers
        .into_iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect()
}

fn canonicalized_resource(account_name: &str, url: &Url) -> String {
    let mut resource = format!("/{account_name}{}", url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }

    for (name, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{name}:{}", values.join(",")));
    }
    resource
}
