pub mod agency;
pub mod error;
pub mod packrat;
pub mod pathmap;
pub mod reaper;
pub mod receiver;
pub mod runtime;
pub mod service;

pub use agency::{Agency, Agent, Discriminator, IndexedAgent, SingletonAgent};
pub use error::RoutingError;
pub use pathmap::{DumpEntry, Installer, Match, PathMap};
pub use receiver::{Receiver, ReceiverKey, TrackedReceiver, WeakReceiver};
pub use runtime::Runtime;
