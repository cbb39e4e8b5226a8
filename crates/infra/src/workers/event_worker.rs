use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use tradeflow_events::{Event, EventBus, Subscription};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Subscriber loop on a dedicated thread.
///
/// - Subscribes to the bus before returning, so nothing published afterwards is missed
/// - Handler errors and panics are logged and swallowed; the loop keeps going
/// - Stops on shutdown or when the bus goes away
#[derive(Debug)]
pub struct EventWorker;

impl EventWorker {
    /// `handler` must be idempotent: delivery is at-least-once.
    pub fn spawn<M, B, H, E>(name: &'static str, bus: &B, mut handler: H) -> io::Result<WorkerHandle>
    where
        M: Event + Send + 'static,
        B: EventBus<M> + ?Sized,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    M: Event,
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    let tick = Duration::from_millis(250);
    debug!(worker = name, "event worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                let event_type = msg.event_type();
                match catch_unwind(AssertUnwindSafe(|| handler(msg))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(worker = name, event_type, error = %err, "event handler failed");
                    }
                    Err(_) => {
                        warn!(worker = name, event_type, "event handler panicked");
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "event worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tradeflow_events::InMemoryEventBus;

    #[derive(Debug, Clone)]
    struct Ping(u32);

    impl Event for Ping {
        fn event_type(&self) -> &'static str {
            "test.ping"
        }

        fn version(&self) -> u32 {
            1
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    fn wait_for(pred: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !pred() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn failing_and_panicking_handlers_do_not_stop_the_worker() {
        let bus = InMemoryEventBus::<Ping>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let handle = EventWorker::spawn("test-worker", &bus, move |Ping(n)| {
            if n == 1 {
                return Err("rejected");
            }
            if n == 2 {
                panic!("boom");
            }
            sink.lock().unwrap().push(n);
            Ok(())
        })
        .unwrap();

        for n in 0..4 {
            bus.publish(Ping(n)).unwrap();
        }

        wait_for(|| seen.lock().unwrap().len() == 2);
        handle.shutdown();
        assert_eq!(*seen.lock().unwrap(), vec![0, 3]);
    }

    #[test]
    fn shutdown_joins_an_idle_worker() {
        let bus = InMemoryEventBus::<Ping>::new();
        let handle = EventWorker::spawn("idle-worker", &bus, |_: Ping| Ok::<_, String>(())).unwrap();
        handle.shutdown();
    }
}
