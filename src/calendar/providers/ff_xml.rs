//! ForexFactory-style weekly XML feed:
//! `<weeklyevents><event><title/><country/><date/><time/><impact/></event>...`

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::calendar::types::RawEvent;
use crate::error::{FetchError, FetchResult};

const ROOT: &str = "weeklyevents";
const EVENT: &[u8] = b"event";

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Country,
    Date,
    Time,
    Impact,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag.to_ascii_lowercase().as_slice() {
            b"title" => Some(Field::Title),
            b"country" => Some(Field::Country),
            b"date" => Some(Field::Date), // MM-DD-YYYY
            b"time" => Some(Field::Time), // "1:30pm", "All Day", "Tentative"
            b"impact" => Some(Field::Impact),
            _ => None,
        }
    }

    fn slot(self, ev: &mut RawEvent) -> &mut Option<String> {
        match self {
            Field::Title => &mut ev.title,
            Field::Country => &mut ev.currency,
            Field::Date => &mut ev.date,
            Field::Time => &mut ev.time,
            Field::Impact => &mut ev.impact,
        }
    }
}

/// Walks `<event>` elements one at a time. Only the text of known children is
/// kept: markup nested inside them is flattened and a repeated child keeps its
/// first value. Incomplete events come back as partial records.
pub fn parse(body: &str) -> FetchResult<Vec<RawEvent>> {
    match root_element(body) {
        Some(name) if name.eq_ignore_ascii_case(ROOT) => {}
        Some(name) => {
            return Err(FetchError::BadFormat(format!(
                "unexpected xml root <{name}>, expected <{ROOT}>"
            )))
        }
        None => return Err(FetchError::BadFormat("no xml root element".into())),
    }

    let xml_clean = scrub_html_entities_for_xml(body);
    let mut reader = Reader::from_str(&xml_clean);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<RawEvent> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let tag = e.name();
                if depth == 2 && tag.as_ref().eq_ignore_ascii_case(EVENT) {
                    current = Some(RawEvent::default());
                } else if depth == 3 && current.is_some() {
                    field = Field::from_tag(tag.as_ref());
                    text.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 && e.name().as_ref().eq_ignore_ascii_case(EVENT) {
                    out.push(RawEvent::default());
                }
            }
            Ok(Event::Text(t)) if field.is_some() => {
                let piece = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                push_piece(&mut text, &piece);
            }
            Ok(Event::CData(c)) if field.is_some() => {
                push_piece(&mut text, &String::from_utf8_lossy(&c));
            }
            Ok(Event::End(_)) => {
                if depth == 3 {
                    if let (Some(f), Some(ev)) = (field.take(), current.as_mut()) {
                        let slot = f.slot(ev);
                        if slot.is_none() && !text.is_empty() {
                            *slot = Some(std::mem::take(&mut text));
                        }
                    }
                } else if depth == 2 {
                    if let Some(ev) = current.take() {
                        out.push(ev);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FetchError::BadFormat(format!(
                    "parsing calendar xml at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }
    Ok(out)
}

fn push_piece(text: &mut String, piece: &str) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(piece);
}

/// Name of the first element in the document, skipping prolog and comments.
fn root_element(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// HTML entities that are not predefined in XML show up in feed titles.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
