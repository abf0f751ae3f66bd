mod ping;
mod publish;
mod subscribe;

pub use ping::subscribe_ping;
pub use publish::{publish, PublishArguments};
pub use subscribe::{subscribe, unsubscribe, SubscribeArguments};
