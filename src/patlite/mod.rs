//! Command grammar + encoder for the signal light.
//!
//! registry -> which commands/options exist, how each option validates, defaults
//! encoder  -> encode(command, options) -> EncodedCommand | ValidationError
//!
//! Pure and stateless: safe to call from any number of tasks at once.

pub mod encoder;
pub mod registry;

pub use encoder::{EncodedCommand, OptionValue, Options, ValidationError, encode};
pub use registry::{CommandName, allowed_commands, rules_for};
