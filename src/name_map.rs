use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_MAP_ENTRY: Regex = Regex::new(r"^\*(\d+)\s+(\S+)").unwrap();
}

/// Mapping from short SPEF numeric identifiers to fully-qualified design
/// names, parsed from the `*NAME_MAP` section of a SPEF file.
///
/// Only the first `*NAME_MAP` section of a file is consumed; the section
/// ends at the first line that is not a `*<id> <name>` entry.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    entries: HashMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        NameMap {
            entries: HashMap::new(),
        }
    }

    /// Parse the name-map section out of a full SPEF text.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        let mut in_section = false;

        for line in content.lines() {
            let line = line.trim();

            if !in_section {
                if line.starts_with("*NAME_MAP") {
                    in_section = true;
                }
                continue;
            }

            match NAME_MAP_ENTRY.captures(line) {
                Some(caps) => {
                    entries.insert(caps[1].to_string(), caps[2].to_string());
                }
                // First non-entry line closes the section for good.
                None => break,
            }
        }

        NameMap { entries }
    }

    /// Look up a raw identifier, if mapped.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|s| s.as_str())
    }

    /// Resolve a raw identifier to its design name, falling back to the
    /// raw identifier itself when unmapped.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_map() {
        let content = "\
*SPEF \"IEEE 1481-1998\"
*NAME_MAP
*1 top/u1/clk
*2 top/u2/in
*3 top/u3/out
*D_NET *5 1.2
";
        let map = NameMap::parse(content);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("1"), Some("top/u1/clk"));
        assert_eq!(map.get("3"), Some("top/u3/out"));
        assert_eq!(map.get("5"), None);
    }

    #[test]
    fn test_section_ends_at_non_entry_line() {
        let content = "\
*NAME_MAP
*1 a
*2 b
not an entry
*3 c
";
        let map = NameMap::parse(content);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("3"), None);
    }

    #[test]
    fn test_section_ends_at_non_numeric_sigil_line() {
        let content = "\
*NAME_MAP
*1 a
*PORTS
*2 b
";
        let map = NameMap::parse(content);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("2"), None);
    }

    #[test]
    fn test_only_first_section_consumed() {
        let content = "\
*NAME_MAP
*1 first
end
*NAME_MAP
*2 second
";
        let map = NameMap::parse(content);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("1"), Some("first"));
        assert_eq!(map.get("2"), None);
    }

    #[test]
    fn test_resolve_fallback() {
        let map = NameMap::parse("*NAME_MAP\n*1 top/u1/a\n");
        assert_eq!(map.resolve("1"), "top/u1/a");
        assert_eq!(map.resolve("99"), "99");
    }

    #[test]
    fn test_missing_section() {
        let map = NameMap::parse("*D_NET *5 1.2\n*END\n");
        assert!(map.is_empty());
    }
}
