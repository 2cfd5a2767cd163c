//! Command implementations for the anisuggest CLI
//!
//! Each command replays input surface events against the engine and
//! prints what an address bar dropdown would show.

mod cache;
mod open;
mod suggest;
mod typing;

pub use cache::execute as manage_cache;
pub use open::execute as open_url;
pub use suggest::execute as suggest;
pub use typing::execute as type_text;
