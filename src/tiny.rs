//! Decoder for the Tiny mapping format.
//!
//! Intermediary jars carry their mappings at [`MAPPINGS_ENTRY_PATH`] in
//! either Tiny v1 (`v1\t<namespaces...>`, members reference their class by
//! name) or Tiny v2 (`tiny\t2\t0\t<namespaces...>`, members nest under the
//! preceding class by indentation). Only the `official` and `intermediary`
//! columns are retained; any other declared namespaces are skipped.

use std::str;

use failure::Error;
use failure_derive::Fail;
use indexmap::IndexMap;

use crate::archive::ArchiveReader;

pub const SOURCE_NAMESPACE: &str = "official";
pub const TARGET_NAMESPACE: &str = "intermediary";
pub const MAPPINGS_ENTRY_PATH: &str = "mappings/mappings.tiny";

#[derive(Debug, Fail)]
#[fail(display = "No {:?} entry in archive", _0)]
pub struct MissingMappingEntry(pub String);

#[derive(Debug, Fail)]
#[fail(display = "Malformed mapping file: {}", _0)]
pub struct MalformedMappingFile(String);

fn malformed(reason: impl Into<String>) -> Error {
    MalformedMappingFile(reason.into()).into()
}

/// A single renamed method or field, with its type descriptor recorded
/// exactly as written in the source namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberMapping {
    pub src_name: String,
    pub dst_name: String,
    pub descriptor: String,
}

/// The decoded mappings for one intermediary version.
///
/// All three maps preserve first-seen order from the mapping file.
/// A class only gets a `methods`/`fields` entry once it actually has one,
/// and every key of those maps is guaranteed to also appear in `classes`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingData {
    pub classes: IndexMap<String, String>,
    pub methods: IndexMap<String, Vec<MemberMapping>>,
    pub fields: IndexMap<String, Vec<MemberMapping>>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum MemberKind {
    Method,
    Field,
}

impl MappingData {
    fn add_class(&mut self, src_name: String, dst_name: String) {
        self.classes.insert(src_name, dst_name);
    }
    fn add_member(&mut self, kind: MemberKind, class_name: &str, member: MemberMapping) {
        if !self.classes.contains_key(class_name) {
            /*
             * A member row showed up for a class we never saw a class record for.
             * Record the class under its own name so the member maps never
             * reference a class missing from `classes`.
             */
            self.classes
                .insert(class_name.into(), class_name.into());
        }
        let map = match kind {
            MemberKind::Method => &mut self.methods,
            MemberKind::Field => &mut self.fields,
        };
        map.entry(class_name.into()).or_insert_with(Vec::new).push(member);
    }
}

/// Locate the mapping payload inside an artifact and decode it.
pub fn extract_mappings(archive: &[u8], reader: &dyn ArchiveReader) -> Result<MappingData, Error> {
    let bytes = reader
        .read_entry(archive, MAPPINGS_ENTRY_PATH)?
        .ok_or_else(|| MissingMappingEntry(MAPPINGS_ENTRY_PATH.into()))?;
    let text = str::from_utf8(&bytes)
        .map_err(|_| MalformedMappingFile("mapping file is not valid UTF-8".into()))?;
    parse_tiny(text)
}

/// Which columns hold the two namespaces we keep.
#[derive(Copy, Clone, Debug)]
struct NamespaceIndex {
    src: usize,
    dst: usize,
}
impl NamespaceIndex {
    fn resolve(namespaces: &[&str]) -> Result<NamespaceIndex, Error> {
        let find = |name: &str| {
            namespaces
                .iter()
                .position(|&ns| ns == name)
                .ok_or_else(|| malformed(format!("namespace {:?} is not declared", name)))
        };
        Ok(NamespaceIndex {
            src: find(SOURCE_NAMESPACE)?,
            dst: find(TARGET_NAMESPACE)?,
        })
    }
}

/// Decode a complete Tiny mapping file (either format version).
pub fn parse_tiny(text: &str) -> Result<MappingData, Error> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| malformed("empty mapping file"))?;
    let columns: Vec<&str> = header.split('\t').collect();
    match columns[0] {
        "v1" => {
            let namespaces = NamespaceIndex::resolve(&columns[1..])?;
            parse_v1(lines, namespaces)
        }
        "tiny" => {
            if columns.len() < 3 || columns[1] != "2" {
                return Err(malformed(format!("unsupported tiny header {:?}", header)));
            }
            let namespaces = NamespaceIndex::resolve(&columns[3..])?;
            parse_v2(lines, namespaces)
        }
        other => Err(malformed(format!("unrecognized header {:?}", other))),
    }
}

fn column<'a>(parts: &[&'a str], index: usize, line: &str) -> Result<&'a str, Error> {
    parts
        .get(index)
        .copied()
        .ok_or_else(|| malformed(format!("truncated record {:?}", line)))
}

/// Tiny v1: every record is self-contained, members name their class in
/// the first declared namespace.
fn parse_v1<'a>(
    lines: impl Iterator<Item = &'a str>,
    namespaces: NamespaceIndex,
) -> Result<MappingData, Error> {
    let mut data = MappingData::default();
    // Maps a class's first-namespace name to its source-namespace name,
    // needed to key member records when `official` is not column zero.
    let mut owners: IndexMap<String, String> = IndexMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        match parts[0] {
            "CLASS" => {
                let first = column(&parts, 1, line)?;
                let src_name = column(&parts, 1 + namespaces.src, line)?;
                let dst_name = column(&parts, 1 + namespaces.dst, line)?;
                if namespaces.src != 0 {
                    owners.insert(first.into(), src_name.into());
                }
                data.add_class(src_name.into(), dst_name.into());
            }
            "METHOD" | "FIELD" => {
                let owner = column(&parts, 1, line)?;
                let descriptor = column(&parts, 2, line)?;
                let src_name = column(&parts, 3 + namespaces.src, line)?;
                let dst_name = column(&parts, 3 + namespaces.dst, line)?;
                let class_name = owners.get(owner).map(String::as_str).unwrap_or(owner);
                let kind = if parts[0] == "METHOD" {
                    MemberKind::Method
                } else {
                    MemberKind::Field
                };
                data.add_member(
                    kind,
                    class_name,
                    MemberMapping {
                        src_name: src_name.into(),
                        dst_name: dst_name.into(),
                        descriptor: descriptor.into(),
                    },
                );
            }
            other => return Err(malformed(format!("unexpected record kind {:?}", other))),
        }
    }
    Ok(data)
}

/// Tiny v2: members nest under the most recent class via indentation.
/// Anything indented deeper than a member (parameters, local variables,
/// comments) is skipped, as are unknown sections.
fn parse_v2<'a>(
    lines: impl Iterator<Item = &'a str>,
    namespaces: NamespaceIndex,
) -> Result<MappingData, Error> {
    let mut data = MappingData::default();
    let mut escaped_names = false;
    let mut in_header = true;
    let mut current_class: Option<String> = None;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let indent = line.bytes().take_while(|&b| b == b'\t').count();
        let parts: Vec<&str> = line[indent..].split('\t').collect();
        if indent == 0 {
            in_header = false;
            if parts[0] != "c" {
                return Err(malformed(format!("unexpected record kind {:?}", parts[0])));
            }
            let src_name = name_column(&parts, 1 + namespaces.src, escaped_names, line)?;
            let dst_name = name_column(&parts, 1 + namespaces.dst, escaped_names, line)?;
            current_class = Some(src_name.clone());
            data.add_class(src_name, dst_name);
        } else if indent == 1 {
            if in_header {
                // Property lines precede the first class record
                if parts[0] == "escaped-names" {
                    escaped_names = true;
                }
                continue;
            }
            let kind = match parts[0] {
                "m" => MemberKind::Method,
                "f" => MemberKind::Field,
                // Comments and unknown sections are skipped per the v2 grammar
                _ => continue,
            };
            let class_name = current_class
                .as_ref()
                .ok_or_else(|| malformed("member record before any class"))?;
            let descriptor = name_column(&parts, 1, escaped_names, line)?;
            let src_name = name_column(&parts, 2 + namespaces.src, escaped_names, line)?;
            let dst_name = name_column(&parts, 2 + namespaces.dst, escaped_names, line)?;
            data.add_member(
                kind,
                class_name,
                MemberMapping {
                    src_name,
                    dst_name,
                    descriptor,
                },
            );
        }
        // Deeper indentation belongs to parameters/comments we don't retain
    }
    Ok(data)
}

fn name_column(
    parts: &[&str],
    index: usize,
    escaped: bool,
    line: &str,
) -> Result<String, Error> {
    let raw = column(parts, index, line)?;
    if escaped {
        unescape(raw)
    } else {
        Ok(raw.into())
    }
}

/// Reverse the Tiny v2 `escaped-names` encoding.
fn unescape(input: &str) -> Result<String, Error> {
    if !input.contains('\\') {
        return Ok(input.into());
    }
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => output.push('\\'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some('0') => output.push('\0'),
            other => {
                return Err(malformed(format!(
                    "invalid escape sequence {:?} in {:?}",
                    other, input
                )))
            }
        }
    }
    Ok(output)
}
