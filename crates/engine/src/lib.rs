pub mod alert;
pub mod decision;
pub mod history;
pub mod policy;
pub mod rule;
pub mod runner;
pub mod window;

pub use decision::{DecisionEngine, RunOutcome};
pub use policy::{DecisionRule, PolicyConfig, WindowRule};
pub use runner::run_once;
pub use window::{classify, CloseDay, WindowPhase, WindowState};
