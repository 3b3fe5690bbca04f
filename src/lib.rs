//! # Kaiwa - Conversation-Flow Engine
//!
//! **Kaiwa** is the conversation-flow engine of a chatbot SDK: given an
//! inbound message turn, it routes execution through a directed graph of
//! conversational steps organized into named streams, tracks a position
//! cursor across turns, and decides per turn whether to advance, prompt the
//! user, fall back, or terminate.
//!
//! ## Core Workflow
//!
//! 1.  **Author steps**: build [`Step`](step::Step)s with
//!     [`StepBuilder`](step::StepBuilder), overriding only the capabilities
//!     you need (`satisfied`, `prompt`, `extract_info`, `next`, `expects`,
//!     `fallback`).
//! 2.  **Declare the flow**: assemble streams, classification mappings,
//!     event handlers and auto-response policies with
//!     [`FlowBuilder`](flow::FlowBuilder). `build()` validates the stream
//!     graph (pointer resolvability, acyclicity) up front.
//! 3.  **Run turns**: hand each inbound turn's client collaborator to
//!     [`Flow::run`](flow::Flow::run). The engine walks the streams,
//!     invokes prompts (synchronously or through suspend/resume
//!     continuations), and emits every effect through the client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kaiwa::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Author steps. This one asks for a city until it has one.
//!     let get_city = Step::builder()
//!         .satisfied(|| false)
//!         .extract_info(|part| {
//!             // pull a slot value out of the message part
//!             let _ = part;
//!         })
//!         .prompt(|| {
//!             // queue a response through the client, then end the turn
//!             None
//!         })
//!         .build();
//!
//!     // 2. Declare the flow.
//!     let flow = Flow::builder()
//!         .stream("main", "checkWeather")
//!         .stream("checkWeather", vec![StreamEntry::from(get_city.clone())])
//!         .stream("end", vec![StreamEntry::from(get_city)])
//!         .classification("check_weather", "checkWeather")
//!         .build()?;
//!
//!     // 3. Run a turn against your client implementation.
//!     let client: Rc<dyn FlowClient> = obtain_client();
//!     let cursor = flow.run(client)?;
//!     println!("turn settled on stream '{}'", cursor.stream_name);
//!     Ok(())
//! }
//! # fn obtain_client() -> Rc<dyn kaiwa::client::FlowClient> { unimplemented!() }
//! ```

pub mod classification;
pub mod client;
mod controller;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod flow;
pub mod message;
pub mod prelude;
pub mod step;
