//! Boundaries to the outside world that the controller talks to: the speech
//! synthesizer and the live caption transcript.

pub mod caption;
pub mod speech;

pub use caption::{spawn_caption_feed, CaptionFeed, Transcript};
pub use speech::{CommandUtterer, SpeechQueue, SpeechSink, Utterer};
