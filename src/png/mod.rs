//! png
//!
//! Text metadata embedded in PNG files, with the generation parameters
//! written by AI image tools pulled out into flat keys.
//!
//! The result of [`extract`] holds every text chunk under its keyword, plus
//! derived keys when a recognized chunk is present:
//!
//! | chunk        | derived keys                                              |
//! |--------------|-----------------------------------------------------------|
//! | `parameters` | `prompt`, `negative_prompt`, `steps`, `sampler`, ...      |
//! | `Dream`      | `prompt`, `steps`, `seed`, `cfg_scale`, `sampler`, `size` |
//! | `prompt`     | ComfyUI API graph: `model`, `steps`, `seed`, `prompt` ... |
//! | `workflow`   | ComfyUI editor graph: same keys, lower priority           |
//!
//! plus `tool` naming the generator. A JSON `prompt` chunk is moved to
//! `workflow_api` so the `prompt` key always holds prose.

pub mod chunks;
pub mod params;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;

pub use chunks::{read_text_chunks, TextChunk};
pub use params::{parse_comfy_graph, parse_dream, parse_generation_parameters};

/// Default per-chunk size limit.
pub const DEFAULT_MAX_TEXT_CHUNK: usize = 16 * 1024 * 1024;

/// Key the generator name is stored under.
pub const TOOL_KEY: &str = "tool";

/// Key a ComfyUI API graph is moved to.
pub const WORKFLOW_API_KEY: &str = "workflow_api";

/// PNG text extractor with a size limit per chunk.
#[derive(Debug, Clone)]
pub struct PngTextExtractor {
    max_text_chunk: usize,
}

impl Default for PngTextExtractor {
    fn default() -> Self {
        Self {
            max_text_chunk: DEFAULT_MAX_TEXT_CHUNK,
        }
    }
}

impl PngTextExtractor {
    pub fn new(max_text_chunk: usize) -> Self {
        Self { max_text_chunk }
    }

    /// Whether `path` names a PNG by extension.
    pub fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"))
    }

    /// Extract text metadata from the PNG at `path`.
    ///
    /// Never fails: unreadable files and non-PNGs give an empty map.
    pub fn extract(&self, path: &Path) -> BTreeMap<String, String> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!("cannot open {}: {e}", path.display());
                return BTreeMap::new();
            }
        };
        let mut reader = BufReader::new(file);
        match read_text_chunks(&mut reader, self.max_text_chunk) {
            Ok(Some(chunks)) => interpret(chunks),
            Ok(None) => {
                debug!("{} is not a PNG", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                debug!("cannot read {}: {e}", path.display());
                BTreeMap::new()
            }
        }
    }
}

/// Extract with the default chunk limit.
pub fn extract(path: impl AsRef<Path>) -> BTreeMap<String, String> {
    PngTextExtractor::default().extract(path.as_ref())
}

/// Build the result map from decoded chunks.
pub fn interpret(chunks: Vec<TextChunk>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    // Derived maps in ascending priority.
    let mut editor_graph = BTreeMap::new();
    let mut api_graph = BTreeMap::new();
    let mut text_params = BTreeMap::new();
    let mut tool = None;

    for TextChunk { keyword, text } in chunks {
        let json = params::looks_like_json(&text);
        match keyword.as_str() {
            "workflow" => {
                if json {
                    editor_graph = parse_comfy_graph(&text);
                }
                tool = Some("ComfyUI");
            }
            "prompt" if json => {
                api_graph = parse_comfy_graph(&text);
                tool = Some("ComfyUI");
                out.insert(WORKFLOW_API_KEY.to_string(), text);
                continue;
            }
            "prompt" => text_params = parse_generation_parameters(&text),
            "parameters" => {
                if !json {
                    text_params = parse_generation_parameters(&text);
                }
                tool = tool.or(Some("Stable Diffusion WebUI"));
            }
            "Dream" => {
                if !json {
                    text_params =
                        parse_dream(&text).unwrap_or_else(|| parse_generation_parameters(&text));
                }
                tool = tool.or(Some("InvokeAI"));
            }
            "invokeai_metadata" | "sd-metadata" => tool = tool.or(Some("InvokeAI")),
            _ => {}
        }
        out.insert(keyword, text);
    }

    for derived in [editor_graph, api_graph, text_params] {
        out.extend(derived);
    }
    if let Some(tool) = tool {
        out.insert(TOOL_KEY.to_string(), tool.to_string());
    }
    out
}
