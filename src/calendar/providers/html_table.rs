//! Economic-calendar markup: one `<tr class="js-event-item">` per event inside
//! the `economicCalendarData` table.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::calendar::clean_text;
use crate::calendar::types::RawEvent;
use crate::error::{FetchError, FetchResult};

const TABLE_MARKER: &str = "economicCalendarData";
const ROW_CLASS: &str = "js-event-item";

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn re_row() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r"(?is)<tr\b([^>]*)>(.*?)</tr>")
}

fn re_cell() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    re(&RE, r"(?is)<td\b([^>]*)>(.*?)</td>")
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    // Double-quoted, single-quoted or bare values.
    let re = re(
        &RE,
        r#"(?is)([a-z0-9_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
    );
    re.captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4)))
        .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class")
        .map(|c| c.split_whitespace().any(|k| k == class))
        .unwrap_or(false)
}

/// "High Volatility Expected" -> "High"; "Moderate ..." maps to "Medium".
fn impact_from_sentiment(title: &str) -> Option<String> {
    let word = title.split_whitespace().next()?;
    if word.eq_ignore_ascii_case("moderate") {
        Some("Medium".to_string())
    } else {
        Some(word.to_string())
    }
}

pub fn parse(body: &str) -> FetchResult<Vec<RawEvent>> {
    if !body.contains(TABLE_MARKER) {
        return Err(FetchError::BadFormat(format!(
            "calendar table `{TABLE_MARKER}` not found in markup"
        )));
    }

    let mut out = Vec::new();
    for row in re_row().captures_iter(body) {
        let row_attrs = &row[1];
        if !has_class(row_attrs, ROW_CLASS) {
            continue;
        }

        let mut ev = RawEvent {
            date: attr(row_attrs, "data-event-datetime"),
            ..RawEvent::default()
        };

        for cell in re_cell().captures_iter(&row[2]) {
            let (cell_attrs, inner) = (&cell[1], &cell[2]);
            if has_class(cell_attrs, "flagCur") {
                ev.currency = Some(clean_text(inner));
            } else if has_class(cell_attrs, "sentiment") {
                ev.impact = attr(cell_attrs, "title")
                    .filter(|t| !t.is_empty())
                    .and_then(|t| impact_from_sentiment(&t))
                    .or_else(|| Some(clean_text(inner)));
            } else if has_class(cell_attrs, "event") {
                ev.title = Some(clean_text(inner));
            }
        }
        out.push(ev);
    }
    Ok(out)
}
