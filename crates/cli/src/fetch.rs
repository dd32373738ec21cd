// ABOUTME: Blocking page fetcher with a minimum delay between requests and bounded retries.
// ABOUTME: Builds detail-page URLs from identifiers and returns the page body as text.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    base_url: String,
    delay: Duration,
    retries: u32,
    last_request: Option<Instant>,
}

impl Fetcher {
    /// `base_url` is the detail-page URL with the identifier left off the end.
    pub fn new(base_url: impl Into<String>, delay: Duration, retries: u32) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).with_context(|| format!("invalid base url {:?}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("invalid base url {:?}: unsupported scheme {}", base_url, parsed.scheme());
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            base_url,
            delay,
            retries,
            last_request: None,
        })
    }

    pub fn url_for(&self, id: &str) -> String {
        format!("{}{}", self.base_url, id)
    }

    /// Fetches the detail page for `id`, retrying failed attempts.
    pub fn fetch(&mut self, id: &str) -> Result<String> {
        let url = self.url_for(id);
        let mut attempt = 0;
        loop {
            self.wait_turn();
            match self.get(&url) {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(url = %url, attempt, error = %err, "fetch failed, retrying");
                    thread::sleep(self.delay * attempt);
                }
                Err(err) => return Err(err.context(format!("fetching {}", url))),
            }
        }
    }

    fn get(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        Ok(resp.text()?)
    }

    fn wait_turn(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn fetches_page_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/entry").query_param("docId", "123456789");
            then.status(200).body("<html>ok</html>");
        });

        let mut fetcher = Fetcher::new(server.url("/entry?docId="), Duration::ZERO, 0).unwrap();
        assert_eq!(fetcher.fetch("123456789").unwrap(), "<html>ok</html>");
        mock.assert();
    }

    #[test]
    fn retries_then_gives_up() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/entry");
            then.status(500);
        });

        let mut fetcher = Fetcher::new(server.url("/entry?docId="), Duration::from_millis(1), 2).unwrap();
        let err = fetcher.fetch("123456789").unwrap_err();
        assert!(err.to_string().contains("fetching"));
        mock.assert_hits(3);
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = Fetcher::new("entry.naver?docId=", Duration::ZERO, 0).unwrap_err();
        assert!(err.to_string().contains("invalid base url"));
        let err = Fetcher::new("ftp://example.com/entry?docId=", Duration::ZERO, 0).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme ftp"));
    }
}
