use crate::{config::AssetsConfig, error::AssetError};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead},
    path::{Path, PathBuf},
};

/// Disposal metadata attached to a predicted label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    pub category: String,
    pub instructions: String,
    pub bin_color: String,
}

impl Default for Guidance {
    fn default() -> Self {
        Guidance {
            category: "Uncategorized".to_string(),
            instructions: "No specific instructions available.".to_string(),
            bin_color: "grey".to_string(),
        }
    }
}

/// Read-only label list and guidance map, loaded once at startup.
///
/// Loading is best-effort: each asset that cannot be read leaves its slot
/// empty and the service degrades (raw indices, default guidance) instead
/// of refusing to start.
#[derive(Debug, Default)]
pub struct Assets {
    labels: Vec<String>,
    guidelines: HashMap<String, Guidance>,
}

impl Assets {
    pub fn load(config: &AssetsConfig) -> Self {
        let labels_path = config.get_labels_path();
        let labels = match load_labels(&labels_path) {
            Ok(labels) => {
                tracing::info!("Loaded {} labels from {:?}", labels.len(), labels_path);
                labels
            }
            Err(e) => {
                tracing::warn!(
                    "Labels file not usable at {:?}: {}. Predictions will return raw indices.",
                    labels_path,
                    e
                );
                Vec::new()
            }
        };

        let guidelines_path = config.get_guidelines_path();
        let guidelines = match load_guidelines(&guidelines_path) {
            Ok(guidelines) => {
                tracing::info!(
                    "Loaded {} guidance entries from {:?}",
                    guidelines.len(),
                    guidelines_path
                );
                guidelines
            }
            Err(e) => {
                tracing::warn!("Guidance map not usable: {}. Continuing without it.", e);
                HashMap::new()
            }
        };

        Assets { labels, guidelines }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at the model output position, or a synthesized placeholder
    /// when the label list is shorter than the model's output width.
    pub fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Unknown ({})", index))
    }

    pub fn guidance_for(&self, label: &str) -> Guidance {
        self.guidelines.get(label).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn from_parts(labels: Vec<String>, guidelines: HashMap<String, Guidance>) -> Self {
        Assets { labels, guidelines }
    }
}

fn load_labels(filepath: &Path) -> io::Result<Vec<String>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    Ok(labels)
}

fn load_guidelines(filepath: &Path) -> Result<HashMap<String, Guidance>, AssetError> {
    let file = File::open(filepath).map_err(|source| AssetError::Io {
        path: PathBuf::from(filepath),
        source,
    })?;
    let reader = io::BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| AssetError::Json {
        path: PathBuf::from(filepath),
        source,
    })
}
