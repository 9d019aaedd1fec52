//! Region-bounded playback: decoder contract, controller, keyboard transport.

pub mod clock;
pub mod controller;
pub mod decoder;
pub mod keyboard;
pub mod state;

pub use clock::ClockDecoder;
pub use controller::PlaybackController;
pub use decoder::{AudioDecoder, DecoderEvent, LoadId, MockDecoder};
pub use keyboard::{Key, KeyAction, KeyDispatcher, KeyEvent, KeySubscription};
pub use state::{PlaybackSettings, PlayerEvent, PlayerSnapshot, TransportPhase};
