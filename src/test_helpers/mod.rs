//! Fakes and builders shared by unit and integration tests.

mod client;
mod fakes;
mod messages;
mod state;

pub use client::{FakeClient, SentMessage};
pub use fakes::{FailingClassifier, FixedClassifier, RecordingRenderer};
pub use messages::{direct_message, group_message, guard_input, guard_input_at, media_message};
pub use state::{TestBed, test_config};
