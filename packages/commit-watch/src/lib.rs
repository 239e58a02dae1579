// Commit Watch - transaction watchdog and payload validation
//
// Two independent engines consume a partitioned log broker:
// - the watchdog tracks live transactions announced on the control topic and
//   fires a completion callback when a transaction misses its deadline
// - the validation engine checks payloads on data topics against a static
//   schema catalog and dispatches a consequence when a payload violates it
//
// The engines share no state and run as separate processes (see src/bin/).

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
