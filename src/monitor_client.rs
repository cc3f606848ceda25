use async_trait::async_trait;
use pmon_shared::{BasicInfo, StatusResponse};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use url::Url;

use crate::monitor::SnapshotSource;
use crate::prelude::*;
use crate::request_client::{IDENTITY_CLIENT, REQUEST_CLIENT};

/// HTTP client of a process monitor
#[derive(Debug, Clone)]
pub struct MonitorClient {
    base_url: Url,
}

impl MonitorClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid monitor URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid monitor URL: {base_url}");
        }
        // Without a trailing slash, joining would replace the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid monitor endpoint {path}"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        client: &ClientWithMiddleware,
        path: &str,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        trace!("GET {url}");
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach the monitor at {url}: {e}"))?;
        if !response.status().is_success() {
            bail!("The monitor answered {} for {url}", response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse the response of {url}"))
    }
}

#[async_trait(?Send)]
impl SnapshotSource for MonitorClient {
    async fn get_basic(&self, pid: Option<u32>) -> Result<BasicInfo> {
        match pid {
            None => self.get_json(&IDENTITY_CLIENT, "basic").await,
            Some(pid) => self.get_json(&REQUEST_CLIENT, &format!("basic/{pid}")).await,
        }
    }

    async fn get_status(&self) -> Result<StatusResponse> {
        self.get_json(&REQUEST_CLIENT, "status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:8889/", "http://localhost:8889/status")]
    #[case("http://localhost:8889", "http://localhost:8889/status")]
    #[case("http://worker-3:8889/monitor", "http://worker-3:8889/monitor/status")]
    #[case("http://worker-3:8889/monitor/", "http://worker-3:8889/monitor/status")]
    fn test_endpoint_is_joined_to_the_base_url(#[case] base_url: &str, #[case] expected: &str) {
        let client = MonitorClient::new(base_url).unwrap();
        assert_eq!(client.endpoint("status").unwrap().as_str(), expected);
    }

    #[test]
    fn test_basic_endpoint_with_pid() {
        let client = MonitorClient::new("http://localhost:8889/").unwrap();
        assert_eq!(
            client.endpoint("basic/4242").unwrap().as_str(),
            "http://localhost:8889/basic/4242"
        );
    }

    #[rstest]
    #[case("localhost:8889")]
    #[case("not a url")]
    #[case("mailto:ops@example.com")]
    fn test_invalid_base_url(#[case] base_url: &str) {
        assert!(MonitorClient::new(base_url).is_err());
    }
}
