//! Hand-rolled JSON writer for the decoded mapping model.
//!
//! The output shape and formatting are fixed (2-space indent, insertion
//! order preserved) so that generated documents are byte-stable across
//! runs, and the escaper deliberately matches what existing consumers
//! already accept rather than full RFC 8259 escaping.

use std::io::{self, Write};

use indexmap::IndexMap;

use crate::tiny::{MappingData, MemberMapping};

/// Serialize a mapping model as `{"classes": ..., "methods": ..., "fields": ...}`.
///
/// Never fails for a well-formed model; the only error source is the
/// underlying writer.
pub fn write_json<W: Write>(data: &MappingData, out: &mut W) -> io::Result<()> {
    out.write_all(b"{\n")?;
    out.write_all(b"  \"classes\": {\n")?;
    let mut first = true;
    for (src_name, dst_name) in &data.classes {
        if !first {
            out.write_all(b",\n")?;
        }
        write!(
            out,
            "    \"{}\": \"{}\"",
            escape_json(src_name),
            escape_json(dst_name)
        )?;
        first = false;
    }
    out.write_all(b"\n  },\n")?;
    out.write_all(b"  \"methods\": {\n")?;
    write_member_section(&data.methods, out)?;
    out.write_all(b"  },\n")?;
    out.write_all(b"  \"fields\": {\n")?;
    write_member_section(&data.fields, out)?;
    out.write_all(b"  }\n")?;
    out.write_all(b"}")?;
    Ok(())
}

fn write_member_section<W: Write>(
    section: &IndexMap<String, Vec<MemberMapping>>,
    out: &mut W,
) -> io::Result<()> {
    let mut first = true;
    for (class_name, members) in section {
        if !first {
            out.write_all(b",\n")?;
        }
        write!(out, "    \"{}\": [\n", escape_json(class_name))?;
        for (index, member) in members.iter().enumerate() {
            out.write_all(b"      {\n")?;
            writeln!(
                out,
                "        \"srcName\": \"{}\",",
                escape_json(&member.src_name)
            )?;
            writeln!(
                out,
                "        \"dstName\": \"{}\",",
                escape_json(&member.dst_name)
            )?;
            writeln!(
                out,
                "        \"descriptor\": \"{}\"",
                escape_json(&member.descriptor)
            )?;
            if index + 1 < members.len() {
                out.write_all(b"      },\n")?;
            } else {
                out.write_all(b"      }\n")?;
            }
        }
        out.write_all(b"    ]")?;
        first = false;
    }
    out.write_all(b"\n")?;
    Ok(())
}

/// Escape a string for embedding in a JSON document.
///
/// Backslash, double quote and the five short-escape control characters
/// get their two-character escapes; U+2028/U+2029 are escaped so the
/// output stays safe inside script contexts. Every other character passes
/// through untouched, including the remaining ASCII control characters.
/// That last part is a known gap kept for compatibility with the existing
/// output format.
pub fn escape_json(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\u{0008}' => escaped.push_str("\\b"),
            '\u{000C}' => escaped.push_str("\\f"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tiny::parse_tiny;

    fn emit(data: &MappingData) -> String {
        let mut buffer = Vec::new();
        write_json(data, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_json("a\"b\\c"), "a\\\"b\\\\c");
    }

    #[test]
    fn escapes_short_control_characters() {
        assert_eq!(escape_json("a\nb"), "a\\nb");
        assert_eq!(escape_json("a\tb"), "a\\tb");
        assert_eq!(escape_json("a\u{8}\u{c}\rb"), "a\\b\\f\\rb");
    }

    #[test]
    fn escapes_unicode_line_separators() {
        assert_eq!(escape_json("a\u{2028}b"), "a\\u2028b");
        assert_eq!(escape_json("a\u{2029}b"), "a\\u2029b");
    }

    #[test]
    fn other_control_characters_pass_through() {
        // Deliberate compatibility gap: 0x01 is not escaped even though
        // strict JSON rejects raw control characters
        assert_eq!(escape_json("a\u{1}b"), "a\u{1}b");
    }

    #[test]
    fn non_ascii_passes_through() {
        assert_eq!(escape_json("näme/クラス"), "näme/クラス");
    }

    #[test]
    fn exact_output_for_minimal_model() {
        let data = parse_tiny(
            "v1\tofficial\tintermediary\n\
             CLASS\ta\tnet/minecraft/class_1\n\
             METHOD\ta\t()V\tb\tmethod_1\n\
             FIELD\ta\tI\tc\tfield_1\n",
        )
        .unwrap();
        let expected = "{\n\
                        \x20 \"classes\": {\n\
                        \x20   \"a\": \"net/minecraft/class_1\"\n\
                        \x20 },\n\
                        \x20 \"methods\": {\n\
                        \x20   \"a\": [\n\
                        \x20     {\n\
                        \x20       \"srcName\": \"b\",\n\
                        \x20       \"dstName\": \"method_1\",\n\
                        \x20       \"descriptor\": \"()V\"\n\
                        \x20     }\n\
                        \x20   ]\n\
                        \x20 },\n\
                        \x20 \"fields\": {\n\
                        \x20   \"a\": [\n\
                        \x20     {\n\
                        \x20       \"srcName\": \"c\",\n\
                        \x20       \"dstName\": \"field_1\",\n\
                        \x20       \"descriptor\": \"I\"\n\
                        \x20     }\n\
                        \x20   ]\n\
                        \x20 }\n\
                        }";
        assert_eq!(emit(&data), expected);
    }

    #[test]
    fn empty_model_keeps_fixed_shape() {
        let expected = "{\n\
                        \x20 \"classes\": {\n\
                        \n\
                        \x20 },\n\
                        \x20 \"methods\": {\n\
                        \n\
                        \x20 },\n\
                        \x20 \"fields\": {\n\
                        \n\
                        \x20 }\n\
                        }";
        assert_eq!(emit(&MappingData::default()), expected);
    }

    #[test]
    fn memberless_classes_are_omitted_from_member_sections() {
        let data = parse_tiny(
            "v1\tofficial\tintermediary\n\
             CLASS\ta\tnet/minecraft/class_1\n\
             CLASS\tb\tnet/minecraft/class_2\n\
             METHOD\tb\t()V\tc\tmethod_1\n",
        )
        .unwrap();
        let output = emit(&data);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["classes"].as_object().unwrap().len(), 2);
        assert!(parsed["methods"].get("a").is_none());
        assert!(parsed["methods"].get("b").is_some());
        assert_eq!(parsed["fields"].as_object().unwrap().len(), 0);
    }

    #[test]
    fn output_parses_and_preserves_key_order() {
        let data = parse_tiny(
            "v1\tofficial\tintermediary\n\
             CLASS\tz\tnet/minecraft/class_1\n\
             CLASS\ta\tnet/minecraft/class_2\n",
        )
        .unwrap();
        let output = emit(&data);
        serde_json::from_str::<serde_json::Value>(&output).unwrap();
        // Insertion order, not alphabetical
        assert!(output.find("\"z\"").unwrap() < output.find("\"a\"").unwrap());
    }
}
