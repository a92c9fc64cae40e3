//! Prompt catalog for basketball shot analysis

use crate::config::PromptConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Named selector for the instruction template sent with a video
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    #[default]
    Regular,
    Pro,
}

impl PromptVariant {
    /// Lenient parse: anything other than "pro" selects the regular variant
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("pro") {
            PromptVariant::Pro
        } else {
            PromptVariant::Regular
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVariant::Regular => "regular",
            PromptVariant::Pro => "pro",
        }
    }
}

impl FromStr for PromptVariant {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<&str> for PromptVariant {
    fn from(s: &str) -> Self {
        Self::from_name(s)
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in coaching template
pub fn basketball_prompt() -> &'static str {
    r#"Act as an elite basketball coach and analyst. Analyze every shot attempt in this video with the following structure:

- Player Identification (if possible)
- Shot Type (Jump shot, Layup, Dunk, etc.)
- Shot Location (e.g., right corner, top of the key)
- Time of Shot (timestamp or visual marker)
- Result (Make or Miss)
- Form Analysis (brief breakdown of mechanics)
- Defensive Pressure (if present)

Be thorough, structured, and use bullet points for each shot."#
}

/// Immutable set of instruction templates, resolved per variant
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    template: String,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self {
            template: basketball_prompt().to_string(),
        }
    }
}

impl PromptCatalog {
    /// Catalog backed by a custom template
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load the catalog, preferring the configured prompt file
    pub async fn from_config(config: &PromptConfig) -> Self {
        let Some(path) = config.prompt_file.as_ref() else {
            return Self::default();
        };

        match tokio::fs::read_to_string(path).await {
            Ok(content) if !content.trim().is_empty() => {
                debug!("Loaded analysis prompt from {}", path.display());
                Self::with_template(content.trim())
            }
            Ok(_) => {
                warn!("Prompt file {} is empty, using default prompt", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read prompt file {}: {}, using default prompt", path.display(), e);
                Self::default()
            }
        }
    }

    /// Instruction text for a variant.
    ///
    /// Pro and regular share one catalog entry; the pro variant does not
    /// yet request any additional detail.
    pub fn resolve(&self, variant: PromptVariant) -> &str {
        match variant {
            PromptVariant::Regular | PromptVariant::Pro => &self.template,
        }
    }
}
