pub mod chat;
pub mod icons;
pub mod progress;

pub use chat::{render_gauge, render_message, render_status, render_tip, render_transcript, wrap_width};
pub use progress::ReviewSpinner;
