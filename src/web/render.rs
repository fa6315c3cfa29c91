//! Render: read the whole log back and build the HTML page

use html_escape::encode_safe;
use std::fmt::Write as _;

use super::capture::Visit;
use crate::device::summarize;
use crate::diagnostics::{self, Failure};
use crate::record::VisitorRecord;
use crate::store::VisitorStore;

const TEMPLATE: &str = include_str!("../../static/index.html");

/// Every stored record in log order. The current record is added as the
/// newest row when the log can't be trusted to contain it.
pub async fn load_history(store: &dyn VisitorStore, visit: &Visit) -> Vec<VisitorRecord> {
    let (mut records, read_ok) = match store.read_all().await {
        Ok(records) => (records, true),
        Err(e) => {
            diagnostics::report(Failure::Read, "history", &e);
            (Vec::new(), false)
        }
    };

    if !visit.persisted || !read_ok {
        records.push(visit.record.clone());
    }
    records
}

pub fn render_page(visit: &Visit, history: &[VisitorRecord]) -> String {
    let record = &visit.record;
    let parsed = summarize(&visit.device, visit.browser);
    let rows = render_rows(history, !visit.persisted);
    let entry_json = entry_json(record);

    fill(TEMPLATE, |key| {
        let value = match key {
            "timestamp" => encode_safe(&record.timestamp).into_owned(),
            "ip" => encode_safe(&record.ip).into_owned(),
            "city" => encode_safe(&record.city).into_owned(),
            "region" => encode_safe(&record.region).into_owned(),
            "country" => encode_safe(&record.country).into_owned(),
            "isp" => encode_safe(&record.isp).into_owned(),
            "device" => encode_safe(&record.device).into_owned(),
            "parsed" => encode_safe(&parsed).into_owned(),
            "user_agent" => encode_safe(&record.user_agent).into_owned(),
            "count" => history.len().to_string(),
            "rows" => rows.clone(),
            "entry_json" => entry_json.clone(),
            _ => return None,
        };
        Some(value)
    })
}

/// Table body, 1-indexed, oldest first
fn render_rows(history: &[VisitorRecord], last_unsaved: bool) -> String {
    let mut out = String::new();

    for (index, record) in history.iter().enumerate() {
        let unsaved = last_unsaved && index + 1 == history.len();
        let class = if unsaved { " class=\"unsaved\"" } else { "" };
        let _ = writeln!(
            out,
            "        <tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"ua\">{}</td></tr>",
            class,
            index + 1,
            encode_safe(&record.timestamp),
            encode_safe(&record.ip),
            encode_safe(&record.city),
            encode_safe(&record.region),
            encode_safe(&record.country),
            encode_safe(&record.isp),
            encode_safe(&record.device),
            encode_safe(&record.user_agent),
        );
    }

    out
}

/// JSON for the inline `application/json` script block
fn entry_json(record: &VisitorRecord) -> String {
    let json = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());
    // Keep `</script>` and friends out of the script element
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Single pass over `{{key}}` placeholders so substituted text is never re-scanned
fn fill<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match lookup(key) {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
