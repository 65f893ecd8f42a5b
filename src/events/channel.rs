//! Progress channel between the pipeline and a front-end.
//!
//! Worker threads of the comparison scheduler each hold a clone of the
//! sender; the CLI drains the receiver on its own thread.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Never blocks. Events are dropped once the receiver is gone.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender has been dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Yields events until every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    /// Unbounded, so a slow progress bar never stalls a comparison.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender for runs without a front-end.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CompareEvent, PipelineEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn failure_event_crosses_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Compare(CompareEvent::Failed {
                original: PathBuf::from("a.png"),
                altered: PathBuf::from("b.png"),
                message: "exit code 2".to_string(),
            }));
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Compare(CompareEvent::Failed { message, .. }) => {
                assert_eq!(message, "exit code 2");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn iter_ends_after_the_last_worker_sender_drops() {
        let (sender, receiver) = EventChannel::new();

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let sender = sender.clone();
                thread::spawn(move || sender.send(Event::Pipeline(PipelineEvent::Started)))
            })
            .collect();
        drop(sender);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(receiver.iter().count(), 3);
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }
}
