// src/fetch.rs
//
// One authenticated portal session for the whole run. Login happens once;
// the cookie store carries that session across the thirteen ledger fetches.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use crate::config::Credentials;
use crate::period::PeriodWindow;

/// Login form path, relative to the portal base URL.
const LOGIN_PATH: &str = "login/index.aspx";
/// Member unit valuation ledger report path.
const LEDGER_PATH: &str = "club/reports/member_valuation_units.aspx";
/// The portal's "current members" member filter.
const ALL_CURRENT_MEMBERS: &str = "-1";
/// Date format the report endpoint expects in its query string.
const QUERY_DATE_FORMAT: &str = "%m/%d/%Y";

/// Blocking portal client scoped to one club.
pub struct ReportClient {
    http: Client,
    login_url: Url,
    ledger_url: Url,
    club: String,
}

impl ReportClient {
    pub fn new(base_url: &Url, club: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            login_url: base_url.join(LOGIN_PATH).context("joining login URL")?,
            ledger_url: base_url
                .join(LEDGER_PATH)
                .context("joining ledger report URL")?,
            club: club.into(),
        })
    }

    /// Post the login form once. Returns the final status code so the
    /// caller can log it; any non-success status is an error.
    pub fn login(&self, credentials: &Credentials) -> Result<StatusCode> {
        let form = [
            ("user", credentials.username.as_str()),
            ("pass", credentials.password.as_str()),
            ("btnLogin", "Login"),
        ];
        let response = self
            .http
            .post(self.login_url.clone())
            .form(&form)
            .send()
            .context("sending login request")?;
        let status = response.status();
        if !status.is_success() {
            bail!("login rejected with status {status}");
        }
        Ok(status)
    }

    /// Fetch one month's ledger report page covering every current member.
    pub fn fetch_month_ledger(&self, period: &PeriodWindow) -> Result<String> {
        let start = period.start.format(QUERY_DATE_FORMAT).to_string();
        let end = period.end.format(QUERY_DATE_FORMAT).to_string();
        let query = [
            ("club", self.club.as_str()),
            ("MemberID", ALL_CURRENT_MEMBERS),
            ("StartDate", start.as_str()),
            ("ShowLedgerEntries", "Submit"),
            ("EndDate", end.as_str()),
        ];
        let response = self
            .http
            .get(self.ledger_url.clone())
            .query(&query)
            .send()
            .with_context(|| format!("requesting ledger report for {}", period.label()))?
            .error_for_status()
            .with_context(|| format!("ledger report for {}", period.label()))?;
        response.text().context("reading ledger report body")
    }
}
