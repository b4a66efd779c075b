//! Message Handler Registry (spec §4.3): turns one raw Skype message into
//! a `HandledMessage` -- base fields plus a typed `StructuredData`
//! variant -- dispatching on `messagetype`.

mod call;
mod contacts;
mod factory;
mod handler;
mod location;
mod media;
mod message;
mod poll;
mod regexes;
mod scheduled_call;
mod text;
mod thread_activity;
mod unknown;

pub use factory::Factory;
pub use handler::{base_fields, Handler};
pub use message::HandlerMessage;

pub use call::CallHandler;
pub use contacts::ContactsHandler;
pub use location::LocationHandler;
pub use media::MediaHandler;
pub use poll::PollHandler;
pub use scheduled_call::ScheduledCallHandler;
pub use text::TextHandler;
pub use thread_activity::ThreadActivityHandler;
pub use unknown::UnknownHandler;
