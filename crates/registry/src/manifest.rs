use serde::{Deserialize, Serialize};

/// One declarative factory entry loaded at startup. `import_path` names the
/// Rust constructor function a deployment wires up (e.g.
/// `"myorg::tools::http_get"`); this crate never resolves the path itself —
/// a binary's `main` walks the manifest and calls `register_*` for each
/// entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntry {
    pub import_path: String,
    pub kind: PluginKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Tool,
    Agent,
    Llm,
    Executor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    pub entries: Vec<PluginEntry>,
}

impl PluginManifest {
    #[must_use]
    pub fn new(entries: Vec<PluginEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn of_kind(&self, kind: PluginKind) -> Vec<&PluginEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_entries_by_kind() {
        let manifest = PluginManifest::new(vec![
            PluginEntry { import_path: "a".into(), kind: PluginKind::Tool },
            PluginEntry { import_path: "b".into(), kind: PluginKind::Llm },
        ]);
        assert_eq!(manifest.of_kind(PluginKind::Tool).len(), 1);
    }
}
