pub mod agent;
pub mod cli;
pub mod dom;
pub mod host;
pub mod inject;
pub mod scheduler;
pub mod screen;
pub mod state;
pub mod store;
pub mod trace;

pub use agent::error::{AutofillError, InjectError, SessionAbort};
pub use agent::orchestrator::AutofillEngine;
pub use dom::dom_model::{Document, NodeId};
pub use dom::page::{PageContext, StaticPage};
pub use screen::detector::detect_forms;
