//! Companion `.nfo` files
//!
//! A video may be accompanied by an XML-ish `.nfo` file with the same stem.
//! Only flat `<name>value</name>` elements are looked at; the first
//! occurrence of a name wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::record::{clean_tag, unescape_tag};

/// Larger files are not parsed
pub const MAX_NFO_SIZE: u64 = 64 * 1024;

/// Values taken from a `.nfo` file, already escaped for storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NfoInfo {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    pub mime: Option<String>,
}

/// Text of every leaf element, keyed by lowercase name. Text and CDATA
/// sections are concatenated; a parse error ends the scan with what was
/// read so far.
fn elements(text: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut values = HashMap::new();
    let mut current: Option<(String, String)> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                current = Some((name, String::new()));
            }
            Ok(Event::Text(t)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&unescape_tag(&String::from_utf8_lossy(&t)));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some((name, value)) = current.take() {
                    values.entry(name).or_insert(value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Stopping .nfo parse at byte {}: {}", reader.error_position(), e);
                break;
            }
        }
    }
    values
}

fn field(values: &HashMap<String, String>, name: &str) -> Option<String> {
    values.get(name).and_then(|v| clean_tag(v))
}

/// Parse the text of an `.nfo` file
pub fn parse_nfo(text: &str) -> NfoInfo {
    let values = elements(text);
    let title = values.get("title").map(|title| match values.get("episodetitle") {
        Some(episode) => format!("{} - {}", title, episode),
        None => title.clone(),
    });
    NfoInfo {
        title: title.and_then(|t| clean_tag(&t)),
        comment: field(&values, "plot"),
        date: field(&values, "capturedate"),
        genre: field(&values, "genre"),
        mime: field(&values, "mime"),
    }
}

/// Path of the `.nfo` companion of a video
pub fn nfo_path(video: &Path) -> PathBuf {
    video.with_extension("nfo")
}

/// Read and parse the `.nfo` companion of `video`, if there is a usable one
pub fn read_nfo(video: &Path) -> Option<NfoInfo> {
    let path = nfo_path(video);
    let meta = fs::metadata(&path).ok()?;
    if meta.len() > MAX_NFO_SIZE {
        tracing::info!("Not parsing very large .nfo file {:?}", path);
        return None;
    }
    tracing::debug!("Parsing .nfo file: {:?}", path);
    let bytes = fs::read(&path).ok()?;
    Some(parse_nfo(&String::from_utf8_lossy(&bytes)))
}
