//! # Events Module
//!
//! Progress reporting over channels.
//!
//! ## Design
//! The pipeline emits events through a crossbeam channel; the CLI
//! subscribes on its own thread and drives a progress bar.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Compare(CompareEvent::Progress(p)) = event {
//!             println!("Compared {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&input_dir, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
