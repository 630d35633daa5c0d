use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BRACED_NET_NAME: Regex = Regex::new(r"\{(.+?)\}").unwrap();
}

/// Output/input pin lists for one net, as read from a netlist-direction
/// description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetIo {
    /// Driving pins (`Output:` lines).
    pub outputs: Vec<String>,
    /// Receiving pins (`Input:` lines).
    pub inputs: Vec<String>,
}

/// Read and parse a netlist-direction file.
pub fn read_netlist_info(path: &str) -> Result<HashMap<String, NetIo>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read netlist file '{}'", path))?;
    Ok(parse_netlist_info(&content))
}

/// Parse `Net name:` / `Output:` / `Input:` blocks. Net names may be
/// wrapped in `{...}`; pin values keep only their first token (a trailing
/// cell-type annotation is dropped).
pub fn parse_netlist_info(content: &str) -> HashMap<String, NetIo> {
    let mut net_to_io: HashMap<String, NetIo> = HashMap::new();
    let mut current_net: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Net name:") {
            let name = match BRACED_NET_NAME.captures(line) {
                Some(caps) => caps[1].to_string(),
                None => rest.trim().to_string(),
            };
            net_to_io.entry(name.clone()).or_default();
            current_net = Some(name);
        } else if line.starts_with("Output") {
            if let (Some(net), Some(pin)) = (current_net.as_ref(), first_value_token(line)) {
                net_to_io.get_mut(net).unwrap().outputs.push(pin);
            }
        } else if line.starts_with("Input") {
            if let (Some(net), Some(pin)) = (current_net.as_ref(), first_value_token(line)) {
                net_to_io.get_mut(net).unwrap().inputs.push(pin);
            }
        }
    }

    net_to_io
}

/// First whitespace-separated token after the line's `:`.
fn first_value_token(line: &str) -> Option<String> {
    let (_, value) = line.split_once(':')?;
    value.split_whitespace().next().map(|s| s.to_string())
}
