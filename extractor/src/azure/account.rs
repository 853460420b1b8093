use super::AzureError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

// Well known Azurite credentials, used for `UseDevelopmentStorage=true`.
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEV_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Storage account credentials and service endpoints parsed from a
/// connection string.
#[derive(Clone)]
pub struct StorageAccount {
    pub name: String,
    pub queue_endpoint: Url,
    pub blob_endpoint: Url,
    mac: Hmac<Sha256>,
}

impl StorageAccount {
    fn new(
        name: &str,
        key: &str,
        queue_endpoint: Url,
        blob_endpoint: Url,
    ) -> Result<Self, AzureError> {
        let key = STANDARD.decode(key)?;
        let mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|_| {
            AzureError::InvalidConnectionString("account key cannot be used for signing".into())
        })?;

        Ok(StorageAccount {
            name: name.to_string(),
            queue_endpoint,
            blob_endpoint,
            mac,
        })
    }

    fn development() -> Result<Self, AzureError> {
        StorageAccount::new(
            DEV_ACCOUNT_NAME,
            DEV_ACCOUNT_KEY,
            parse_endpoint(DEV_QUEUE_ENDPOINT)?,
            parse_endpoint(DEV_BLOB_ENDPOINT)?,
        )
    }

    /// Base64 HMAC-SHA256 of the string to sign, keyed by the account key.
    pub fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

// The key never shows up in logs.
impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccount")
            .field("name", &self.name)
            .field("queue_endpoint", &self.queue_endpoint.as_str())
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl FromStr for StorageAccount {
    type Err = AzureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = HashMap::new();
        for segment in s.split(';').map(str::trim).filter(|seg| !seg.is_empty()) {
            // Values (account keys) may contain '=' padding, split on the first one only
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                AzureError::InvalidConnectionString("segment without '='".into())
            })?;
            fields.insert(key.trim().to_ascii_lowercase(), value.trim());
        }

        if fields
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return StorageAccount::development();
        }

        let required = |name: &str| {
            fields
                .get(&name.to_ascii_lowercase())
                .copied()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AzureError::InvalidConnectionString(format!("missing {name}")))
        };

        let account_name = required("AccountName")?;
        let account_key = required("AccountKey")?;
        let protocol = fields
            .get("defaultendpointsprotocol")
            .copied()
            .unwrap_or(DEFAULT_PROTOCOL);
        let suffix = fields
            .get("endpointsuffix")
            .copied()
            .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);

        let endpoint = |explicit: &str, service: &str| match fields.get(explicit) {
            Some(url) => parse_endpoint(url),
            None => parse_endpoint(&format!("{protocol}://{account_name}.{service}.{suffix}")),
        };

        let queue_endpoint = endpoint("queueendpoint", "queue")?;
        let blob_endpoint = endpoint("blobendpoint", "blob")?;

        StorageAccount::new(account_name, account_key, queue_endpoint, blob_endpoint)
    }
}

fn parse_endpoint(url: &str) -> Result<Url, AzureError> {
    Url::parse(url).map_err(|e| AzureError::InvalidUrl(format!("{url}: {e}")))
}
