mod run;

pub use run::{run_service, RunPlan};
