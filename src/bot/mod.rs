/// Command and message handlers
pub mod handlers;
/// Long message delivery
pub mod messaging;
/// Progress sink and document source backed by the Bot API
pub mod transport;

pub use transport::{TelegramDocument, TelegramProgress};
