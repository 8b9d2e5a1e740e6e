//! The embedder boundary (component B / §6): the core consumes only a way
//! to serialize a message and report its length and type id, and a way to
//! construct and parse one given a type id and a byte buffer. The core ships
//! no concrete registry of its own.

use std::fmt;

/// A single structured message as the codec sees it.
///
/// `encoded_length` and `serialize` must agree: `serialize().len() as i32
/// == encoded_length()`. The core calls `serialize` at most once per send
/// and relies on the returned length to write the frame's size field.
pub trait Message: Send {
    /// The numeric type id this message is registered under.
    fn type_id(&self) -> u32;

    /// Length in bytes the payload will occupy once serialized.
    fn encoded_length(&self) -> i32;

    /// Serialize this message's payload (header/size/type are handled by
    /// the core, not included here).
    fn serialize(&self) -> Vec<u8>;

    /// Parse `bytes` into this message instance.
    fn parse(&mut self, bytes: &[u8]) -> Result<(), ParseError>;
}

impl fmt::Debug for dyn Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").field("type_id", &self.type_id()).finish()
    }
}

/// Returned by [`Message::parse`] when the payload codec rejects the bytes.
#[derive(Debug, Clone)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Maps numeric type ids to message constructors and back.
///
/// Implementations are provided by the embedding application; the core only
/// calls `has_type` and `create` during dispatch (§4.A Dispatch phase).
pub trait MessageRegistry: Send + Sync {
    fn has_type(&self, id: u32) -> bool;

    /// Construct a default/empty instance of the message registered under
    /// `id`. Returns `None` if `id` is not registered (the core treats this
    /// the same as `has_type` returning false).
    fn create(&self, id: u32) -> Option<Box<dyn Message>>;
}
