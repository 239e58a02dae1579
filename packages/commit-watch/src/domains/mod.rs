// Domain modules
//
// Each domain owns one engine. They share nothing but the kernel.

pub mod validation;
pub mod watchdog;
