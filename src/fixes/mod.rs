//! Fix templates and their instantiation.
//!
//! - [`FixTemplate`]: static [`TemplateMeta`] plus a [`FixStrategy`]
//! - [`FixRepository`]: the read-only catalog, keyed by template id
//! - [`FactorFixMap`]: which templates address which factor
//! - [`FixInstance`]: a template projected onto one record
//!
//! # Example
//!
//! ```
//! use llm_diagnostics::fixes::{FactorFixMap, FixRepository};
//! use llm_diagnostics::model::FactorId;
//!
//! let repository = FixRepository::builtin();
//! let map = FactorFixMap::builtin();
//! for id in map.templates_for(FactorId::NoMaxTokens) {
//!     assert!(repository.get(id).is_some());
//! }
//! ```

mod catalog;
mod factor_map;
mod instance;
mod metric;
mod repository;
mod template;

pub use factor_map::FactorFixMap;
pub use instance::FixInstance;
pub use metric::{Metric, MetricCategory, MetricsBuilder};
pub use repository::{FixRepository, TemplateInfo};
pub use template::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, MetricGenerator,
    TemplateMeta,
};
