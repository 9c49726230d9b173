//! mockwire-delivery: playback of canned HTTP responses for client tests.
//!
//! A test builds a [`ResponseSpec`] (status, headers, body, or a transport
//! error) and hands it to a [`DeliveryEngine`] together with the
//! [`DeliveryClient`] under test. The engine then emits the callbacks a
//! real network stack would, asynchronously and in order:
//!
//! ```text
//! on_response_received ─► on_data_received × n ─► on_finished
//! on_failed                                    (error responses)
//! ```
//!
//! No network I/O happens anywhere. Bodies can be split into several data
//! events with a delay between them, and the client may cancel at any
//! point.
//!
//! # Scheduling
//!
//! Steps are run by a [`Scheduler`]. [`TokioScheduler`] uses a tokio
//! runtime; [`ManualScheduler`] keeps a virtual clock so tests can step
//! through a playback deterministically.
//!
//! ```
//! use std::sync::Arc;
//! use mockwire_delivery::{
//!     DeliveryEngine, DeliveryHandle, HeaderMap, ManualScheduler, RecordingClient, ResponseSpec,
//! };
//!
//! let scheduler = ManualScheduler::new();
//! let engine = DeliveryEngine::new(scheduler.clone());
//! let client = Arc::new(RecordingClient::new());
//!
//! let spec = ResponseSpec::chunked(200, HeaderMap::new(), "0123456789", 3);
//! engine.begin_delivery(spec, DeliveryHandle::next(), client.clone()).unwrap();
//! assert!(client.is_empty());
//!
//! scheduler.run_until_idle();
//! assert_eq!(client.chunk_lengths(), vec![4, 3, 3]);
//! assert!(client.is_terminal());
//! ```

mod chunk;
mod client;
mod engine;
mod error;
mod header;
mod recorder;
mod response;
mod scheduler;

pub use chunk::ChunkPlan;
pub use client::{DeliveryClient, DeliveryHandle};
pub use engine::{DeliveryEngine, DeliveryState};
pub use error::{DeliveryError, DeliveryResult, TransportError};
pub use header::{Header, HeaderMap};
pub use recorder::{DeliveryEvent, EventHook, RecordingClient};
pub use response::{ResponseKind, ResponseSpec, SuccessResponse};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, Task, TokioScheduler};
