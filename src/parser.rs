use log::warn;

use crate::name_map::NameMap;
use crate::rctree::NetRecord;

const NET_START: &str = "*D_NET";
const NET_END: &str = "*END";
const SECTION_CONN: &str = "*CONN";
const SECTION_CAP: &str = "*CAP";
const SECTION_RES: &str = "*RES";
const PIN_LINE: &str = "*I";
const PORT_SEPARATOR: char = ':';

/// Active section inside a `*D_NET` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Conn,
    Cap,
    Res,
}

/// Streaming parser for the per-net blocks of a SPEF description.
///
/// Line handling is tolerant: lines with too few fields or non-numeric
/// value fields are skipped, never fatal.
pub struct SpefParser {
    name_map: NameMap,
}

impl SpefParser {
    pub fn new(name_map: NameMap) -> Self {
        SpefParser { name_map }
    }

    /// Parse the name map out of `content` and build a parser around it.
    pub fn from_content(content: &str) -> Self {
        SpefParser::new(NameMap::parse(content))
    }

    pub fn name_map(&self) -> &NameMap {
        &self.name_map
    }

    /// Lazily iterate the net records of `content`. Each record is yielded
    /// once its terminator is seen; a net still open at end of input is
    /// discarded.
    pub fn nets<'a>(&'a self, content: &'a str) -> NetRecords<'a> {
        NetRecords {
            lines: content.lines(),
            name_map: &self.name_map,
            pending: None,
        }
    }
}

/// Iterator over completed `NetRecord`s.
pub struct NetRecords<'a> {
    lines: std::str::Lines<'a>,
    name_map: &'a NameMap,
    /// A `*D_NET` line that terminated the previous net and still has to
    /// start the next one.
    pending: Option<&'a str>,
}

impl<'a> Iterator for NetRecords<'a> {
    type Item = NetRecord;

    fn next(&mut self) -> Option<NetRecord> {
        let mut record: Option<NetRecord> = None;
        let mut section = Section::None;

        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                // running out of lines discards any half-open net
                None => self.lines.next()?.trim(),
            };

            if line.starts_with(NET_START) {
                if let Some(done) = record.take() {
                    // a new net begins before *END: treat it as the
                    // previous net's terminator and replay the marker
                    self.pending = Some(line);
                    return Some(done);
                }
                record = start_record(line, self.name_map);
                section = Section::None;
                continue;
            }

            if record.is_none() {
                continue;
            }

            if line.starts_with(NET_END) {
                return record.take();
            }
            if line.starts_with(SECTION_CONN) {
                section = Section::Conn;
                continue;
            }
            if line.starts_with(SECTION_CAP) {
                section = Section::Cap;
                continue;
            }
            if line.starts_with(SECTION_RES) {
                section = Section::Res;
                continue;
            }

            if let Some(rec) = record.as_mut() {
                match section {
                    Section::Conn => parse_conn_line(line, rec, self.name_map),
                    Section::Cap => parse_cap_line(line, rec),
                    Section::Res => parse_res_line(line, rec),
                    Section::None => {}
                }
            }
        }
    }
}

/// Open a record from a `*D_NET <net-id> ...` marker line.
fn start_record(line: &str, name_map: &NameMap) -> Option<NetRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let raw_id = parts[1].trim_start_matches('*').to_string();
    let name = name_map.resolve(&raw_id).to_string();
    Some(NetRecord {
        raw_id,
        name,
        ..Default::default()
    })
}

/// `*I *<node-id> <I|O> ...` inside `*CONN`: direction `I` records a load,
/// `O` the driver (first one wins). A `:`-separated id whose base resolves
/// through the name map gets a `<resolved>/<port>` display name.
fn parse_conn_line(line: &str, rec: &mut NetRecord, name_map: &NameMap) {
    if !line.starts_with(PIN_LINE) {
        return;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return;
    }
    let raw_node = parts[1].trim_start_matches('*');

    if let Some((base, port)) = raw_node.split_once(PORT_SEPARATOR) {
        if let Some(resolved) = name_map.get(base) {
            rec.pin_names
                .insert(raw_node.to_string(), format!("{}/{}", resolved, port));
        }
    }

    match parts[2] {
        "I" => rec.loads.push(raw_node.to_string()),
        "O" => {
            if rec.driver.is_some() {
                warn!(
                    "net '{}': more than one driver pin, ignoring '{}'",
                    rec.name, raw_node
                );
            } else {
                rec.driver = Some(raw_node.to_string());
            }
        }
        _ => {}
    }
}

/// `<index> *<node> <value>` inside `*CAP`.
fn parse_cap_line(line: &str, rec: &mut NetRecord) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return;
    }
    let node = parts[1].trim_start_matches('*');
    if let Ok(cap) = parts[2].parse::<f64>() {
        rec.caps.push((node.to_string(), cap));
    }
}

/// `<index> *<node1> *<node2> <value>` inside `*RES`.
fn parse_res_line(line: &str, rec: &mut NetRecord) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return;
    }
    let node1 = parts[1].trim_start_matches('*');
    let node2 = parts[2].trim_start_matches('*');
    if let Ok(res) = parts[3].parse::<f64>() {
        rec.edges
            .push((node1.to_string(), node2.to_string(), res));
    }
}
