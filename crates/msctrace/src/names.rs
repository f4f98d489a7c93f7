//! Module and message name dictionary used to label decoded records.
//!
//! Loaded from JSON:
//!
//! ```json
//! { "modules": { "1": "ModB" }, "messages": { "0x0000": "MsgA" } }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use msctrace_record::ObjectId;
use serde::Deserialize;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Module names are clipped so chart columns stay aligned.
pub const MAX_NAME_LEN: usize = 10;

/// Upper bound on dictionary file size.
pub const MAX_NAMES_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NamesFile {
    modules: BTreeMap<String, String>,
    messages: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone)]
pub struct Names {
    modules: HashMap<u8, String>,
    messages: HashMap<u16, String>,
}

impl Names {
    pub fn load(path: &Path) -> CliResult<Self> {
        let context = format!("failed reading {}", path.display());
        let meta = std::fs::metadata(path).map_err(|err| io_error(&context, err))?;
        if meta.len() > MAX_NAMES_FILE_SIZE {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "{context}: file too large ({} bytes, max {MAX_NAMES_FILE_SIZE})",
                    meta.len()
                ),
            ));
        }
        let text = std::fs::read_to_string(path).map_err(|err| io_error(&context, err))?;
        Self::from_json(&text)
            .map_err(|msg| CliError::new(DATA_INVALID, format!("{}: {msg}", path.display())))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let file: NamesFile =
            serde_json::from_str(text).map_err(|err| format!("invalid names file: {err}"))?;

        let mut names = Names::default();
        for (key, name) in file.modules {
            let module = parse_key(&key)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| format!("invalid module id {key:?} (expected 0-255)"))?;
            names.register_module(module, &name);
        }
        for (key, name) in file.messages {
            let id = parse_key(&key)
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| format!("invalid message id {key:?} (expected 0-65535)"))?;
            names.register_message(id, name);
        }
        Ok(names)
    }

    pub fn register_module(&mut self, module: u8, name: &str) {
        let clipped: String = name.chars().take(MAX_NAME_LEN).collect();
        self.modules.insert(module, clipped);
    }

    pub fn register_message(&mut self, id: u16, name: impl Into<String>) {
        self.messages.insert(id, name.into());
    }

    pub fn module_name(&self, module: u8) -> String {
        self.modules
            .get(&module)
            .cloned()
            .unwrap_or_else(|| format!("UNK({module})"))
    }

    /// Lifeline label: hex instance, then module name.
    pub fn object_label(&self, id: ObjectId) -> String {
        format!("{:x}:{}", id.instance(), self.module_name(id.module()))
    }

    pub fn message_label(&self, id: u16) -> String {
        self.messages
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown Message(0x{id:04x})"))
    }
}

fn parse_key(key: &str) -> Option<u32> {
    let key = key.trim();
    match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => key.parse().ok(),
    }
}
