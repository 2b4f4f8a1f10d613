pub mod message_delivery;
pub mod support_message;
pub mod support_thread;
pub mod thread_participant;
