pub mod event;
pub mod generator;
pub mod occurrence;

pub use event::Event;
pub use generator::Generator;
pub use occurrence::{NewOccurrence, Occurrence, Span};
