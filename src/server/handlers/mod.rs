mod code_action;
mod completion;
mod definition;
mod signature;
pub(crate) mod util;

pub use code_action::handle_code_action;
pub use completion::handle_completion;
pub use definition::handle_definition;
pub use signature::handle_signature_help;
