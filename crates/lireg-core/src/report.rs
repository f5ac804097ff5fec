//! JSON shape of a pipeline report, shared by the web server and the CLI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CarrierDetails, CarrierOutcome, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJson {
    pub date: String,
    pub pdf_url: String,
    pub total_mc_numbers: usize,
    pub results: Vec<OutcomeJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeJson {
    pub mc: String,
    pub usdot: Option<String>,
    pub carrier_details: CarrierDetailsJson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CarrierDetailsJson {
    Record {
        usdot: String,
        carrier_info: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl From<&CarrierOutcome> for OutcomeJson {
    fn from(o: &CarrierOutcome) -> Self {
        let carrier_details = match &o.details {
            CarrierDetails::Record(record) => CarrierDetailsJson::Record {
                usdot: record.usdot.to_string(),
                carrier_info: record.info.clone(),
                message: record.note.clone(),
            },
            CarrierDetails::Failed(f) => CarrierDetailsJson::Failure {
                error: f.message.clone(),
                details: f.details.clone(),
                status: f.status,
            },
        };

        OutcomeJson {
            mc: o.mc.to_string(),
            usdot: o.usdot.as_ref().map(|u| u.to_string()),
            carrier_details,
        }
    }
}

impl From<&PipelineResult> for ReportJson {
    fn from(r: &PipelineResult) -> Self {
        ReportJson {
            date: r.date.to_string(),
            pdf_url: r.document_url.clone(),
            total_mc_numbers: r.total_mc_numbers,
            results: r.outcomes.iter().map(OutcomeJson::from).collect(),
        }
    }
}
