//! png::params
//!
//! Parsers for the generation parameters AI image tools embed.
//!
//! - Stable Diffusion WebUI text (`parameters` chunk):
//!
//!   ```text
//!   a lighthouse at dusk, film grain
//!   Negative prompt: blurry, lowres
//!   Steps: 30, Sampler: DPM++ 2M, CFG scale: 7, Seed: 42, Model: "sdxl, base"
//!   ```
//!
//! - InvokeAI dream command lines (`Dream` chunk):
//!   `"a lighthouse" -s 50 -S 42 -C 7.5 -A k_lms -W 512 -H 512`
//!
//! - ComfyUI node graphs (`prompt` and `workflow` chunks), JSON.

use std::collections::BTreeMap;

use serde_json::Value;

/// Parse WebUI-style generation text into `prompt`, `negative_prompt` and
/// one entry per `key: value` pair on the parameter line.
///
/// Only a first line without `:` is taken as the prompt. Keys are
/// lower-cased with spaces replaced by underscores. Other lines, and
/// anything after the parameter line, are dropped.
pub fn parse_generation_parameters(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(negative) = trimmed.strip_prefix("Negative prompt:") {
            out.insert("negative_prompt".to_string(), negative.trim().to_string());
        } else if is_parameter_line(trimmed) {
            for (key, value) in parameter_pairs(trimmed) {
                out.insert(key, value);
            }
            break;
        } else if i == 0 && !trimmed.is_empty() && !trimmed.contains(':') {
            out.insert("prompt".to_string(), trimmed.to_string());
        }
    }
    out
}

fn is_parameter_line(line: &str) -> bool {
    line.starts_with("Steps:") || line.contains(", Steps:") || line.contains("Sampler: ")
}

/// Split on commas outside double quotes, then on the first `:`.
fn parameter_pairs(line: &str) -> Vec<(String, String)> {
    split_unquoted(line, ',')
        .into_iter()
        .filter_map(|part| {
            let (key, value) = part.split_once(':')?;
            let key = normalize_key(key);
            if key.is_empty() {
                return None;
            }
            Some((key, unquote(value.trim()).to_string()))
        })
        .collect()
}

fn split_unquoted(line: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                parts.push(line[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(line[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse an InvokeAI dream command line.
///
/// Returns `None` when the text does not start with a quoted prompt.
pub fn parse_dream(text: &str) -> Option<BTreeMap<String, String>> {
    let rest = text.trim().strip_prefix('"')?;
    let end = rest.find('"')?;
    let mut out = BTreeMap::new();
    out.insert("prompt".to_string(), rest[..end].to_string());

    let mut args = rest[end + 1..].split_whitespace();
    let mut width = None;
    let mut height = None;
    while let Some(flag) = args.next() {
        let key = match flag {
            "-s" | "--steps" => "steps",
            "-S" | "--seed" => "seed",
            "-C" | "--cfg_scale" => "cfg_scale",
            "-A" | "--sampler" => "sampler",
            "-W" | "--width" => "width",
            "-H" | "--height" => "height",
            _ => continue,
        };
        let Some(value) = args.next() else { break };
        match key {
            "width" => width = Some(value),
            "height" => height = Some(value),
            _ => {
                out.insert(key.to_string(), value.to_string());
            }
        }
    }
    if let (Some(w), Some(h)) = (width, height) {
        out.insert("size".to_string(), format!("{w}x{h}"));
    }
    Some(out)
}

/// Whether `text` looks like a JSON document rather than prose.
pub fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('{') | Some('['))
}

/// Pull model, sampler settings and prompts out of a ComfyUI graph.
///
/// Accepts both the API form (`{"3": {"class_type": ..., "inputs": ...}}`)
/// and the editor form (`{"nodes": [{"type": ..., "widgets_values": ...}]}`).
pub fn parse_comfy_graph(json: &str) -> BTreeMap<String, String> {
    let Ok(graph) = serde_json::from_str::<Value>(json) else {
        return BTreeMap::new();
    };
    match graph.get("nodes").and_then(Value::as_array) {
        Some(nodes) => editor_graph(nodes),
        None => api_graph(&graph),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn class_of(node: &Value) -> &str {
    node.get("class_type").and_then(Value::as_str).unwrap_or("")
}

fn is_sampler(class: &str) -> bool {
    class.starts_with("KSampler")
}

fn api_graph(graph: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(nodes) = graph.as_object() else {
        return out;
    };
    // Node ids are numeric strings; visit in numeric order for determinism.
    let numeric = |id: &str| id.parse::<u64>().unwrap_or(u64::MAX);
    let mut ids: Vec<&String> = nodes.keys().collect();
    ids.sort_by(|a, b| numeric(a).cmp(&numeric(b)).then_with(|| a.cmp(b)));

    for id in &ids {
        let node = &nodes[id.as_str()];
        let Some(inputs) = node.get("inputs") else {
            continue;
        };
        if !out.contains_key("model") {
            if let Some(model) = inputs
                .get("ckpt_name")
                .or_else(|| inputs.get("unet_name"))
                .and_then(Value::as_str)
            {
                out.insert("model".to_string(), model.to_string());
            }
        }
        if is_sampler(class_of(node)) && !out.contains_key("steps") {
            for (input, key) in [
                ("steps", "steps"),
                ("cfg", "cfg_scale"),
                ("seed", "seed"),
                ("noise_seed", "seed"),
                ("sampler_name", "sampler"),
                ("scheduler", "scheduler"),
            ] {
                if let Some(v) = inputs.get(input).and_then(scalar) {
                    out.insert(key.to_string(), v);
                }
            }
            for (input, key) in [("positive", "prompt"), ("negative", "negative_prompt")] {
                if let Some(text) = linked_text(nodes, inputs.get(input)) {
                    out.insert(key.to_string(), text);
                }
            }
        }
    }

    if !out.contains_key("prompt") {
        let first_text = ids.iter().find_map(|id| {
            let node = &nodes[id.as_str()];
            if class_of(node).starts_with("CLIPTextEncode") {
                node.get("inputs")?.get("text")?.as_str().map(str::to_owned)
            } else {
                None
            }
        });
        if let Some(text) = first_text {
            out.insert("prompt".to_string(), text);
        }
    }
    out
}

/// Follow a `[node_id, slot]` link to a text-encode node's `text` input.
fn linked_text(nodes: &serde_json::Map<String, Value>, link: Option<&Value>) -> Option<String> {
    let id = link?.as_array()?.first()?;
    let id = match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let text = nodes.get(&id)?.get("inputs")?.get("text")?;
    text.as_str().map(str::to_owned)
}

fn editor_graph(nodes: &[Value]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for node in nodes {
        let kind = node.get("type").and_then(Value::as_str).unwrap_or("");
        let Some(widgets) = node.get("widgets_values").and_then(Value::as_array) else {
            continue;
        };
        if kind.starts_with("CheckpointLoader") && !out.contains_key("model") {
            if let Some(model) = widgets.first().and_then(Value::as_str) {
                out.insert("model".to_string(), model.to_string());
            }
        } else if kind.starts_with("CLIPTextEncode") && !out.contains_key("prompt") {
            if let Some(text) = widgets.first().and_then(Value::as_str) {
                out.insert("prompt".to_string(), text.to_string());
            }
        } else if kind == "KSampler" && !out.contains_key("steps") {
            // seed, seed control, steps, cfg, sampler, scheduler, denoise
            for (index, key) in [(0, "seed"), (2, "steps"), (3, "cfg_scale"), (4, "sampler"), (5, "scheduler")] {
                if let Some(v) = widgets.get(index).and_then(scalar) {
                    out.insert(key.to_string(), v);
                }
            }
        }
    }
    out
}
