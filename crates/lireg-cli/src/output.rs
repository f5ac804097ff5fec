use std::io::Write;

use lireg_core::section::{RegisterSection, scan_region};
use lireg_core::{CarrierDetails, CarrierOutcome, McNumber, PipelineResult};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn print_banner(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", sep)?;
    }
    Ok(())
}

/// Print the per-carrier report of a finished run.
pub fn print_report(
    w: &mut dyn Write,
    result: &PipelineResult,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    print_banner(w, &format!("REGISTER {}", result.date), color)?;
    writeln!(w, "Source: {}", result.document_url)?;
    writeln!(w, "MC numbers found: {}", result.total_mc_numbers)?;

    let total = result.outcomes.len();
    for (i, outcome) in result.outcomes.iter().enumerate() {
        writeln!(w)?;
        print_outcome(w, i, total, outcome, color)?;
    }
    writeln!(w)?;
    Ok(())
}

fn print_outcome(
    w: &mut dyn Write,
    index: usize,
    total: usize,
    outcome: &CarrierOutcome,
    color: ColorMode,
) -> std::io::Result<()> {
    let usdot = outcome
        .usdot
        .as_ref()
        .map(|u| format!("USDOT {u}"))
        .unwrap_or_else(|| "no USDOT".to_string());

    match &outcome.details {
        CarrierDetails::Record(record) => {
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} -> {} ({})",
                    index + 1,
                    total,
                    outcome.mc.bold(),
                    "OK".green(),
                    usdot
                )?;
            } else {
                writeln!(w, "[{}/{}] {} -> OK ({})", index + 1, total, outcome.mc, usdot)?;
            }
            if let Some(note) = &record.note {
                if color.enabled() {
                    writeln!(w, "      {}", note.dimmed())?;
                } else {
                    writeln!(w, "      {}", note)?;
                }
            }
            for (label, value) in &record.info {
                if color.enabled() {
                    writeln!(w, "      {} {}", format!("{label}:").dimmed(), value)?;
                } else {
                    writeln!(w, "      {}: {}", label, value)?;
                }
            }
        }
        CarrierDetails::Failed(failure) => {
            let tag = match failure.kind {
                lireg_core::FailureKind::Lookup => "LOOKUP FAILED",
                lireg_core::FailureKind::Scrape => "SCRAPE FAILED",
            };
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} -> {} ({})",
                    index + 1,
                    total,
                    outcome.mc.bold(),
                    tag.red(),
                    usdot
                )?;
            } else {
                writeln!(w, "[{}/{}] {} -> {} ({})", index + 1, total, outcome.mc, tag, usdot)?;
            }
            writeln!(w, "      {}", failure.message)?;
            if let Some(details) = &failure.details {
                writeln!(w, "      {}", truncate(details, 200))?;
            }
            if let Some(status) = failure.status {
                writeln!(w, "      HTTP status: {}", status)?;
            }
        }
    }
    Ok(())
}

/// Print the final summary.
pub fn print_summary(
    w: &mut dyn Write,
    result: &PipelineResult,
    color: ColorMode,
) -> std::io::Result<()> {
    let summary = result.summary();

    print_banner(w, "SUMMARY", color)?;
    writeln!(w, "  MC numbers processed: {}", result.outcomes.len())?;
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "  {} {}", "Resolved:".green(), summary.resolved)?;
    } else {
        writeln!(w, "  Resolved: {}", summary.resolved)?;
    }
    if summary.lookup_failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "USDOT lookup failed:".yellow(), summary.lookup_failed)?;
        } else {
            writeln!(w, "  USDOT lookup failed: {}", summary.lookup_failed)?;
        }
    }
    if summary.scrape_failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Registration fetch failed:".red(), summary.scrape_failed)?;
        } else {
            writeln!(w, "  Registration fetch failed: {}", summary.scrape_failed)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print the MC numbers found in a register's text, per section and merged.
pub fn print_scan(
    w: &mut dyn Write,
    file_name: &str,
    text: &str,
    merged: &[McNumber],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}\n", "SCAN:".bold().cyan(), file_name.bold())?;
    } else {
        writeln!(w, "SCAN: {}\n", file_name)?;
    }

    for section in RegisterSection::ALL {
        let found = scan_region(text, section).len();
        if found == 0 {
            let msg = format!("{}: no MC numbers (section missing or empty)", section.title());
            if color.enabled() {
                writeln!(w, "  {}", msg.dimmed())?;
            } else {
                writeln!(w, "  {}", msg)?;
            }
        } else {
            writeln!(w, "  {}: {}", section.title(), found)?;
        }
    }
    writeln!(w)?;

    for mc in merged {
        writeln!(w, "{}", mc)?;
    }
    writeln!(w)?;
    writeln!(w, "{} unique MC numbers", merged.len())?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lireg_core::{
        CarrierRecord, DateToken, Failure, FailureKind, UsdotNumber, find_mc_numbers,
    };
    use std::collections::BTreeMap;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample_result() -> PipelineResult {
        let usdot = UsdotNumber::parse("7654321").unwrap();
        PipelineResult {
            date: DateToken::new("20240105").unwrap(),
            document_url: "https://li-public.fmcsa.dot.gov/lihtml/rptspdf/LI_REGISTER20240105.PDF"
                .into(),
            total_mc_numbers: 2,
            outcomes: vec![
                CarrierOutcome {
                    mc: McNumber::parse("MC-123456").unwrap(),
                    usdot: Some(usdot.clone()),
                    details: CarrierDetails::Record(CarrierRecord {
                        usdot,
                        info: BTreeMap::from([("Phone".into(), "(555) 010-0000".into())]),
                        note: None,
                    }),
                },
                CarrierOutcome {
                    mc: McNumber::parse("MC-654321").unwrap(),
                    usdot: None,
                    details: CarrierDetails::Failed(Failure {
                        kind: FailureKind::Lookup,
                        message: "USDOT not found or error occurred".into(),
                        details: None,
                        status: Some(403),
                    }),
                },
            ],
        }
    }

    #[test]
    fn report_lists_each_outcome() {
        let result = sample_result();
        let out = render(|w| print_report(w, &result, ColorMode(false)));
        assert!(out.contains("REGISTER 20240105"));
        assert!(out.contains("[1/2] MC-123456 -> OK (USDOT 7654321)"));
        assert!(out.contains("Phone: (555) 010-0000"));
        assert!(out.contains("[2/2] MC-654321 -> LOOKUP FAILED (no USDOT)"));
        assert!(out.contains("HTTP status: 403"));
    }

    #[test]
    fn summary_omits_zero_failure_lines() {
        let mut result = sample_result();
        result.outcomes.truncate(1);
        let out = render(|w| print_summary(w, &result, ColorMode(false)));
        assert!(out.contains("Resolved: 1"));
        assert!(!out.contains("lookup failed"));
        assert!(!out.contains("fetch failed"));
    }

    #[test]
    fn scan_reports_missing_sections() {
        let text = "CERTIFICATES OF REGISTRATION\nNUMBER\nMC-1234 X\nDISMISSALS\nDecisions\n";
        let merged = find_mc_numbers(text);
        let out = render(|w| print_scan(w, "register.pdf", text, &merged, ColorMode(false)));
        assert!(out.contains("Certificates, permits & licenses: no MC numbers"));
        assert!(out.contains("Certificates of registration: 1"));
        assert!(out.contains("MC-1234\n"));
        assert!(out.contains("1 unique MC numbers"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
