//! Connection speed and exit-IP probe.
//!
//! Both probes record what they saw even when the request fails, so gaps in
//! connectivity show up in the stored history instead of vanishing.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use wifi_survey::{SpeedSample, SurveyStore};

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Returned by [`SpeedProbe::determine_ip`] when the echo service fails.
pub const UNKNOWN_IP: &str = "unknown";

/// HTTP client for exit-IP lookups and timed downloads.
#[derive(Clone)]
pub struct SpeedProbe {
    client: reqwest::Client,
}

impl SpeedProbe {
    /// Build a probe, optionally routing every scheme through `proxy`
    /// (e.g. `socks5://localhost:9050`).
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(proxy) = proxy {
            let proxy =
                reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy URL: {proxy}"))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Ask an IP echo service for our exit address.
    ///
    /// A successful answer is stored verbatim and returned trimmed; any
    /// failure yields [`UNKNOWN_IP`].
    pub async fn determine_ip(&self, url: &str, store: &SurveyStore) -> Result<String> {
        match self.fetch_text(url).await {
            Ok(body) => {
                store.insert_exit_ip(&body)?;
                let ip = body.trim().to_string();
                tracing::info!("Exit IP: {ip}");
                Ok(ip)
            }
            Err(e) => {
                tracing::warn!("Failed to determine exit ip: {e:#}");
                Ok(UNKNOWN_IP.to_string())
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("HTTP {status}");
        }
        Ok(resp.text().await?)
    }

    /// Download `url` once, timing the full transfer, and store the sample.
    pub async fn determine_speed(
        &self,
        url: &str,
        exit_ip: Option<&str>,
        store: &SurveyStore,
    ) -> Result<SpeedSample> {
        let mut sample = SpeedSample::pending(url, exit_ip.map(str::to_string));

        if let Err(e) = self.measure(url, &mut sample).await {
            tracing::warn!("Failed to fetch test file: {e:#}");
        }

        let stored = store.insert_speed_sample(&sample)?;
        Ok(stored)
    }

    async fn measure(&self, url: &str, sample: &mut SpeedSample) -> Result<()> {
        let begin = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("HTTP {status}");
        }

        let declared = resp.content_length();
        let body = resp.bytes().await?;
        let duration = begin.elapsed().as_secs_f64();

        let file_size = declared.unwrap_or(body.len() as u64);
        sample.duration_secs = Some(duration);
        sample.file_size = file_size;
        sample.bytes_per_second = if duration > 0.0 {
            file_size as f64 / duration
        } else {
            0.0
        };
        sample.http_code = Some(status.as_u16());

        tracing::info!(
            "Downloaded {file_size} bytes in {duration:.2}s ({:.0} B/s)",
            sample.bytes_per_second
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_proxy() {
        assert!(SpeedProbe::new(Some("not a url")).is_err());
    }

    #[test]
    fn test_socks_proxy_accepted() {
        assert!(SpeedProbe::new(Some("socks5://localhost:9050")).is_ok());
        assert!(SpeedProbe::new(None).is_ok());
    }
}
