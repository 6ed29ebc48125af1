//! HTTP transport for the USNO moon phase table.
//!
//! Requests `GET <api_url>?date=MM/DD/YYYY&nump=5&ID=<identity>` and decodes
//! the JSON body into a [`PhaseTable`]. The identity tag lets the service
//! estimate its number of distinct users.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::time::Duration;

use super::provider::{FetchError, PhaseSource, PhaseTable};
use crate::common::constants::PHASE_TABLE_ENTRIES;
use crate::config::Config;

/// Blocking client for the phase table endpoint.
pub struct UsnoClient {
    client: reqwest::blocking::Client,
    api_url: String,
}

impl UsnoClient {
    /// Create a client with a hard per-request timeout.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("moonlite/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_url(),
            Duration::from_secs(config.request_timeout()),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Query parameters for a table anchored at `date`.
pub fn request_query(date: NaiveDate, identity: &str) -> [(&'static str, String); 3] {
    [
        ("date", date.format("%m/%d/%Y").to_string()),
        ("nump", PHASE_TABLE_ENTRIES.to_string()),
        ("ID", identity.to_string()),
    ]
}

impl PhaseSource for UsnoClient {
    fn fetch_table(&self, date: NaiveDate, identity: &str) -> Result<PhaseTable, FetchError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&request_query(date, identity))
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    /// Serve one canned HTTP response and report the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/moon/phase", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // Drain headers
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let _ = tx.send(request_line);
        });

        (url, rx)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 5, 20).unwrap()
    }

    #[test]
    fn test_request_query_format() {
        let query = request_query(date(), "moonLite");
        assert_eq!(query[0], ("date", "05/20/2019".to_string()));
        assert_eq!(query[1], ("nump", "5".to_string()));
        assert_eq!(query[2], ("ID", "moonLite".to_string()));
    }

    #[test]
    fn test_fetch_table_decodes_body() {
        let (url, rx) = serve_once(
            "200 OK",
            r#"{"error":false,"apiversion":"2.2.1","year":2019,"month":5,"day":20,"numphases":5,
               "phasedata":[{"phase":"Last Quarter","date":"2019 May 26","time":"16:33"},
                            {"phase":"New Moon","date":"2019 Jun 03","time":"10:02"}]}"#,
        );
        let client = UsnoClient::new(&url, Duration::from_secs(5)).unwrap();

        let table = client.fetch_table(date(), "moonLite").unwrap();
        assert!(!table.error);
        assert_eq!(table.phasedata.len(), 2);
        assert_eq!(table.next_new_moon().unwrap().time, "10:02");

        let request_line = rx.recv().unwrap();
        assert!(request_line.starts_with("GET /moon/phase?"));
        assert!(request_line.contains("date=05%2F20%2F2019"));
        assert!(request_line.contains("nump=5"));
        assert!(request_line.contains("ID=moonLite"));
    }

    #[test]
    fn test_error_flag_is_passed_through() {
        let (url, _rx) = serve_once("200 OK", r#"{"error":true,"type":"Error"}"#);
        let client = UsnoClient::new(&url, Duration::from_secs(5)).unwrap();

        let table = client.fetch_table(date(), "moonLite").unwrap();
        assert!(table.error);
    }

    #[test]
    fn test_non_json_body_is_invalid_response() {
        let (url, _rx) = serve_once("200 OK", "<html>maintenance</html>");
        let client = UsnoClient::new(&url, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.fetch_table(date(), "moonLite"),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_http_error_status_is_network_error() {
        let (url, _rx) = serve_once("503 Service Unavailable", "");
        let client = UsnoClient::new(&url, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.fetch_table(date(), "moonLite"),
            Err(FetchError::Network(_))
        ));
    }

    #[test]
    fn test_unreachable_host_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = UsnoClient::new(
            &format!("http://127.0.0.1:{port}/moon/phase"),
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(matches!(
            client.fetch_table(date(), "moonLite"),
            Err(FetchError::Network(_))
        ));
    }
}
