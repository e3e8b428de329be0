//! Plain-HTTP access to the portal: pre-flight reachability and header checks

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::redirect::Policy;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Status, final URL and headers of one request
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub url: String,
    /// Header names are lower-case
    pub headers: BTreeMap<String, String>,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

pub struct PortalProbe {
    base_url: String,
    client: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl PortalProbe {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let no_redirect = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            no_redirect,
        })
    }

    /// Poll the base URL until it answers (any status below 500)
    pub async fn wait_until_reachable(&self, timeout: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match self.client.get(&self.base_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => {
                    info!("Portal reachable at {} ({})", self.base_url, resp.status());
                    return Ok(());
                }
                Ok(resp) => warn!("Portal returned {}", resp.status()),
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for portal at {}...", self.base_url);
                    }
                    if !e.is_connect() {
                        warn!("Portal check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(500)).await;
        }

        Err(E2eError::PortalUnreachable {
            url: self.base_url.clone(),
            attempts,
        })
    }

    /// GET a path, following redirects
    pub async fn fetch(&self, path: &str) -> E2eResult<ProbeResponse> {
        let resp = self.client.get(self.url(path)).send().await?;
        Ok(to_probe_response(&resp))
    }

    /// GET an absolute URL without following redirects
    pub async fn fetch_no_redirect(&self, url: &str) -> E2eResult<ProbeResponse> {
        let resp = self.no_redirect.get(url).send().await?;
        Ok(to_probe_response(&resp))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn to_probe_response(resp: &reqwest::Response) -> ProbeResponse {
    let headers = resp
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    ProbeResponse {
        status: resp.status().as_u16(),
        url: resp.url().to_string(),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to every connection
    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_collects_headers() {
        let base = serve(
            "HTTP/1.1 200 OK\r\nX-Frame-Options: DENY\r\nX-Content-Type-Options: nosniff\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        let probe = PortalProbe::new(&format!("{}/", base)).unwrap();
        probe.wait_until_reachable(Duration::from_secs(5)).await.unwrap();

        let resp = probe.fetch("/login").await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("X-Frame-Options"), Some("DENY"));
        assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
        assert!(resp.url.ends_with("/login"));
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let base = serve(
            "HTTP/1.1 301 Moved Permanently\r\nLocation: https://portal.cempal.example/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let probe = PortalProbe::new(&base).unwrap();
        let resp = probe.fetch_no_redirect(&base).await.unwrap();
        assert_eq!(resp.status, 301);
        assert_eq!(resp.header("location"), Some("https://portal.cempal.example/"));
    }

    #[tokio::test]
    async fn test_unreachable_portal() {
        // bind then drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = PortalProbe::new(&format!("http://127.0.0.1:{}", port)).unwrap();
        let err = probe
            .wait_until_reachable(Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::PortalUnreachable { attempts, .. } if attempts >= 1));
    }
}
