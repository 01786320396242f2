//! Planner prompt templates (Handlebars, `.pmt` files)

mod embedded;
mod loader;

pub use loader::{PlannerContext, PromptLoader, TEMPLATES};
