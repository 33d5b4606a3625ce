//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                               |
//! |-----------|----------------------------------------------------------------|
//! | `session` | `Status`, `Job`, `Difficulty`, `Start`, `Edit`, `Submit`,      |
//! |           | `Hint`, `Inquire`, `Continue`, `Finish`, `Reset`               |
//! | `config`  | `Config`                                                       |
//! | `serve`   | `Serve`                                                        |

pub mod config;
pub mod serve;
pub mod session;

pub use config::cmd_config;
pub use serve::cmd_serve;
pub use session::{
    cmd_continue, cmd_difficulty, cmd_edit, cmd_finish, cmd_hint, cmd_inquire, cmd_job,
    cmd_reset, cmd_start, cmd_status, cmd_submit,
};
