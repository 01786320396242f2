//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Templates the planner needs
pub const TEMPLATES: [&str; 2] = ["planner-system", "planner-request"];

/// Context for rendering the planner request
#[derive(Debug, Clone, Serialize)]
pub struct PlannerContext {
    pub goal: String,
    pub input_root: String,
    pub output_root: String,
    pub file_types: Vec<String>,
    /// Catalog as pretty JSON
    pub operations: String,
    /// History as pretty JSON
    pub history: String,
    pub has_history: bool,
    pub step_count: usize,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (`paths.prompts`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader and register every planner template
    ///
    /// Fails if an override file is unreadable or not a valid template.
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let mut loader = Self {
            hbs: Self::engine(),
            override_dir: override_dir.filter(|d| d.exists()).map(Path::to_path_buf),
        };
        for name in TEMPLATES {
            let source = loader.load_template(name)?;
            loader
                .hbs
                .register_template_string(name, source)
                .map_err(|e| eyre!("Invalid template {}: {}", name, e))?;
        }
        Ok(loader)
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Result<Self> {
        Self::new(None)
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts carry JSON and paths; HTML escaping would mangle them
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks `<override_dir>/{name}.pmt` first, then the embedded copy.
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a registered template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        info!("Rendering template '{}'", template_name);
        self.hbs
            .render(template_name, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The planner system prompt
    pub fn system_prompt(&self) -> Result<String> {
        self.render("planner-system", &serde_json::json!({}))
    }
}
