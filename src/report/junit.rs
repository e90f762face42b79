//! JUnit XML: one `<testsuite>` per `bySuite` key.
//!
//! Per-case fidelity is not kept in the suite index, so each suite gets
//! synthesized cases: `passed` passing, `failed` failing and `skipped`
//! skipped, in that order.

use crate::aggregate::AggregateSnapshot;
use crate::model::Totals;
use std::fmt::Write as _;

/// Whether XML 1.0 allows `c` anywhere in a document, even as a reference.
const fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Replace characters XML 1.0 cannot carry with U+FFFD.
#[must_use]
pub fn xml_safe(input: &str) -> String {
    input
        .chars()
        .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
        .collect()
}

/// Escape text for an attribute value. Whitespace controls become character
/// references so they survive attribute normalization.
#[must_use]
pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in xml_safe(input).chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

#[must_use]
pub fn to_junit(snapshot: &AggregateSnapshot) -> String {
    let t = &snapshot.totals;
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<testsuites name=\"qa_pulse\" tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" time=\"{}\">",
        t.total,
        t.failed,
        t.skipped,
        seconds(t.duration_ms)
    );
    for (name, entry) in &snapshot.by_suite {
        write_suite(&mut out, name, &entry.totals);
    }
    out.push_str("</testsuites>\n");
    out
}

fn write_suite(out: &mut String, name: &str, t: &Totals) {
    let suite = xml_escape(name);
    let _ = writeln!(
        out,
        "  <testsuite name=\"{suite}\" tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" time=\"{}\">",
        t.total,
        t.failed,
        t.skipped,
        seconds(t.duration_ms)
    );
    let mut index = 0_u64;
    let mut case = |out: &mut String, body: &str| {
        index += 1;
        let _ = write!(
            out,
            "    <testcase classname=\"{suite}\" name=\"{suite} #{index}\""
        );
        if body.is_empty() {
            out.push_str("/>\n");
        } else {
            let _ = writeln!(out, ">{body}</testcase>");
        }
    };
    for _ in 0..t.passed {
        case(out, "");
    }
    for _ in 0..t.failed {
        case(out, "<failure message=\"failed\"/>");
    }
    for _ in 0..t.skipped {
        case(out, "<skipped/>");
    }
    out.push_str("  </testsuite>\n");
}
