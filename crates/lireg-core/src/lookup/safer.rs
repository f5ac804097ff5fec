use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{LookupError, fetch_html};
use crate::{McNumber, UsdotNumber};

const SNAPSHOT_URL: &str = "https://safer.fmcsa.dot.gov/query.asp";
const REFERER: &str = "https://safer.fmcsa.dot.gov/";
const ACCEPT: &str = "text/html,application/xhtml+xml";

/// SAFER company snapshot URL for an MC number.
pub fn usdot_lookup_url(mc: &McNumber) -> String {
    format!(
        "{SNAPSHOT_URL}?searchtype=ANY&query_type=queryCarrierSnapshot&query_param=MC_MX&original_query_param=NAME&query_string={}",
        urlencoding::encode(mc.as_str())
    )
}

/// First 4–8 digit run after the "USDOT Number:" label on the same line.
pub fn parse_usdot(body: &str) -> Option<UsdotNumber> {
    static USDOT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"USDOT Number:.*?([0-9]{4,8})").unwrap());

    USDOT_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| UsdotNumber(m.as_str().to_string()))
}

pub(crate) async fn resolve_usdot(
    client: &reqwest::Client,
    mc: &McNumber,
    timeout: Duration,
) -> Result<Option<UsdotNumber>, LookupError> {
    let url = usdot_lookup_url(mc);
    let body = fetch_html(client, &url, ACCEPT, REFERER, timeout).await?;
    Ok(parse_usdot(&body))
}
