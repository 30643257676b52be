//! Protocol module - what travels over the host/window channel.
//!
//! - [`Envelope`] - `{success, data | error}` reply to every invoke
//! - [`HostMessage`] - invoke/send from a window to the host
//! - [`WindowEvent`] - event pushed from the host to a window

mod envelope;
mod message;

pub use envelope::Envelope;
pub use message::{HostMessage, InvokeOutcome, WindowEvent, WindowId};
