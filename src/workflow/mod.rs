pub mod bind;
pub mod error;
pub mod renew;

pub use bind::{BindOutcome, BindRequest, BindingWorkflow, Profile};
pub use error::{BindError, RenewalFailure};
pub use renew::{CycleReport, RenewalOutcome, RenewalPolicy, RenewalRecord, RenewalScheduler};
