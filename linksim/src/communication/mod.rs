mod delivery;
mod message;

pub(crate) use delivery::Delivery;
pub use message::Message;
pub use message::MessagePtr;
pub(crate) use message::RoutedMessage;
pub(crate) use message::TimePriorityMessageQueue;
