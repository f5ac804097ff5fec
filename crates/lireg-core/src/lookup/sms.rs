use std::collections::BTreeMap;
use std::time::Duration;

use super::{LookupError, fetch_html};
use crate::{CarrierRecord, UsdotNumber};

const REFERER: &str = "https://ai.fmcsa.dot.gov/";
const ACCEPT: &str = "text/html";

/// Note attached to a record whose page had no carrier info list.
pub const NO_CARRIER_INFO: &str = "No carrier info found";

/// SMS carrier registration page for a USDOT number.
pub fn carrier_registration_url(usdot: &UsdotNumber) -> String {
    format!(
        "https://ai.fmcsa.dot.gov/SMS/Carrier/{}/CarrierRegistration.aspx",
        usdot.as_str()
    )
}

/// Parse the `ul.col1` label/value list of a registration page.
///
/// Returns the map and, when the list is missing, an explanatory note. Items
/// lacking either a `label` or a `span.dat` are skipped.
pub fn parse_carrier_registration(html: &str) -> (BTreeMap<String, String>, Option<String>) {
    let document = scraper::Html::parse_document(html);
    let list_sel = scraper::Selector::parse("ul.col1").unwrap();
    let item_sel = scraper::Selector::parse("li").unwrap();
    let label_sel = scraper::Selector::parse("label").unwrap();
    let value_sel = scraper::Selector::parse("span.dat").unwrap();

    let Some(list) = document.select(&list_sel).next() else {
        return (BTreeMap::new(), Some(NO_CARRIER_INFO.to_string()));
    };

    let mut info = BTreeMap::new();
    for item in list.select(&item_sel) {
        let (Some(label), Some(value)) = (
            item.select(&label_sel).next(),
            item.select(&value_sel).next(),
        ) else {
            continue;
        };

        let key = stripped_pieces(label.text()).join("").replace(':', "");
        let value = stripped_pieces(value.text())
            .join(" ")
            .replace('\n', " ")
            .replace('\r', "");
        info.insert(key, value);
    }

    (info, None)
}

fn stripped_pieces<'a>(pieces: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    pieces.map(str::trim).filter(|s| !s.is_empty()).collect()
}

pub(crate) async fn carrier_details(
    client: &reqwest::Client,
    usdot: &UsdotNumber,
    timeout: Duration,
) -> Result<CarrierRecord, LookupError> {
    let url = carrier_registration_url(usdot);
    let body = fetch_html(client, &url, ACCEPT, REFERER, timeout).await?;

    // Parse in spawn_blocking to avoid !Send scraper types
    let (info, note) = tokio::task::spawn_blocking(move || parse_carrier_registration(&body))
        .await
        .map_err(|e| LookupError::Parse(e.to_string()))?;

    Ok(CarrierRecord {
        usdot: usdot.clone(),
        info,
        note,
    })
}
