/*!
Subcommand dispatch.

  serve   (ServeArgs  + execute_serve)   HTTP gateway
  encode  (EncodeArgs + execute_encode)  dry-run validation / encoding
  send    (SendArgs   + execute_send)    one-shot device invocation

Each subcommand module exposes one public `execute_*` returning
`anyhow::Result<()>`; shared construction lives in `shared.rs`.
*/

pub mod encode;
pub mod format;
pub mod send;
pub mod serve;
pub mod shared;

pub use encode::{EncodeArgs, execute_encode};
pub use send::{SendArgs, execute_send};
pub use serve::{ServeArgs, execute_serve};
