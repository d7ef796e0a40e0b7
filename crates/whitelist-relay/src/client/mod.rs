//! Client side of the intake flow: the application form controller and the copy control
//! shown next to the server address.

pub mod clipboard;
pub mod form;
pub mod transport;

pub use clipboard::{Clipboard, ClipboardError, CopyControl, CopyMethod};
pub use form::{ApplyForm, FormController, FormState, SubmitBlocked};
pub use transport::{ApplyTransport, HttpApplyTransport, TransportError, TransportResponse};
