// src/scrape.rs
//
// The run itself: walk the thirteen report periods in order against an
// already-authenticated client, parsing each page into one record set.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::extract::extract_report;
use crate::fetch::ReportClient;
use crate::period::report_periods;
use crate::record::RecordSet;

/// Fetch and flatten every report period for `target_year`. Any fetch or
/// parse failure aborts the loop; nothing is written on the way through.
pub fn scrape_year(client: &ReportClient, target_year: i32) -> Result<RecordSet> {
    info!("Scraping myICLUB report data for year {target_year}...");

    let mut records = RecordSet::new();
    for period in report_periods(target_year) {
        let html = client
            .fetch_month_ledger(&period)
            .with_context(|| format!("fetching ledger for {}", period.label()))?;
        let rows = extract_report(&html, &period)
            .with_context(|| format!("extracting ledger for {}", period.label()))?;
        debug!("parsed {} rows for period {}", rows.len(), period.label());
        records.extend(rows);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::record::Value;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use url::Url;

    const PAGE: &str = r#"<html><body>
<table class="memtable">
  <thead>
    <tr><td colspan="2"><h3>Alice Cooper</h3></td></tr>
    <tr class="header-row"><td>Date</td><td>Transaction</td></tr>
  </thead>
  <tr class="tab-cell"><td colspan="2">Value as of period end: $10.00.</td></tr>
</table>
</body></html>"#;

    const DUPLICATE_HEADER_PAGE: &str = r#"<html><body>
<table class="memtable">
  <thead>
    <tr><td colspan="2"><h3>Alice Cooper</h3></td></tr>
    <tr class="header-row"><td>Date</td><td>Date</td></tr>
  </thead>
  <tr><td>01/02/23</td><td>01/03/23</td></tr>
</table>
</body></html>"#;

    fn read_request_line(stream: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            buffer.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buffer);
            if text.contains("\r\n\r\n") || n == 0 {
                return text.lines().next().unwrap_or_default().to_string();
            }
        }
    }

    /// Answer a scripted sequence of requests, capturing each request line.
    fn serve_pages(
        listener: TcpListener,
        responses: Vec<(&'static str, &'static str)>,
    ) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request_line(&mut stream));
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            seen
        })
    }

    fn local_client(listener: &TcpListener) -> ReportClient {
        let base =
            Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        ReportClient::new(&base, "10175").unwrap()
    }

    #[test]
    fn thirteen_periods_accumulate_into_one_set() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = local_client(&listener);
        let handle = serve_pages(listener, vec![("200 OK", PAGE); 13]);

        let records = scrape_year(&client, 2023).unwrap();
        let seen = handle.join().unwrap();

        assert_eq!(records.len(), 13);
        assert_eq!(seen.len(), 13);
        assert!(seen[0].contains("StartDate=12%2F01%2F2022"));
        assert!(seen[0].contains("EndDate=12%2F31%2F2022"));
        assert!(seen[12].contains("StartDate=12%2F01%2F2023"));

        let months: Vec<i32> = records
            .records()
            .iter()
            .map(|record| match record.value("Month") {
                Some(Value::Int(month)) => *month,
                other => panic!("unexpected Month value {other:?}"),
            })
            .collect();
        let mut sorted = months.clone();
        sorted.sort_unstable();
        assert_eq!(months, sorted, "Month labels must be non-decreasing");
        assert_eq!(months.first(), Some(&202212));
        assert_eq!(months.last(), Some(&202312));
    }

    #[test]
    fn a_failing_page_aborts_the_run() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = local_client(&listener);
        let handle = serve_pages(
            listener,
            vec![
                ("200 OK", PAGE),
                ("200 OK", PAGE),
                ("500 Internal Server Error", "boom"),
            ],
        );

        let err = scrape_year(&client, 2023).unwrap_err();
        let seen = handle.join().unwrap();

        assert_eq!(seen.len(), 3, "the loop must stop at the failing page");
        assert!(format!("{err:#}").contains("500"));
    }

    #[test]
    fn malformed_pages_abort_the_run() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = local_client(&listener);
        let handle = serve_pages(listener, vec![("200 OK", DUPLICATE_HEADER_PAGE)]);

        let err = scrape_year(&client, 2023).unwrap_err();
        handle.join().unwrap();

        assert!(format!("{err:#}").contains("duplicate"));
    }

    #[test]
    fn failed_logins_halt_before_any_report_request() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = local_client(&listener);
        let handle = serve_pages(listener, vec![("401 Unauthorized", "denied")]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        let credentials = Credentials {
            username: "alice".into(),
            password: "wrong".into(),
        };
        // The run in miniature: login, then scrape, then write.
        let result = client.login(&credentials).and_then(|_| {
            let records = scrape_year(&client, 2023)?;
            crate::output::write_csv(&output, &records)?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(handle.join().unwrap().len(), 1, "only the login request");
        assert!(!output.exists());
    }
}
