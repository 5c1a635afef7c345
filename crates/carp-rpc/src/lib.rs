//! Server/client call dispatch (§4.4, §5, §6, §7 of spec.md): translating between a
//! type-model `Interface` and the JSON-over-HTTP wire format, routing inbound calls to
//! bound receivers, and presenting a single `Presence` facade over both directions.

pub mod client;
pub mod error;
pub mod fingerprint;
pub mod invocable;
pub mod presence;
pub mod server;
pub mod wire;

pub use client::{ClientTranslator, HttpClient, ReqwestHttpClient, RemoteProxy};
pub use error::DispatchError;
pub use fingerprint::{FingerprintRepository, InMemoryFingerprints};
pub use invocable::{BoxFuture, Executor, Invocable, ResponseValue, TokioExecutor};
pub use presence::Presence;
pub use server::ServerTranslator;
pub use wire::{PrintEntry, RequestEnvelope, ResponseEnvelope};
