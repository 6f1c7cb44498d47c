mod command_input;
mod key_result;
pub mod notices;
pub mod outcome_banner;

pub use command_input::{CommandEvent, CommandInput};
pub use key_result::KeyResult;
pub use notices::Notices;
pub use outcome_banner::{describe as describe_outcome, render_banner};
