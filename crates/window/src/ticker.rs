use crossbeam_channel::{Sender, bounded, select, tick};
use parking_lot::Mutex;
use prism_events::{EventManager, TickEvent};
use prism_scene::Scene;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Fixed-rate scheduler thread: every `interval` it emits a [`TickEvent`] and
/// runs the scene's tick hooks. Stops when dropped.
pub(crate) struct Ticker {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    pub(crate) fn spawn(
        name: String,
        interval: Duration,
        scene: Arc<Mutex<Scene>>,
        events: Arc<EventManager>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread = thread::Builder::new().name(name).spawn(move || {
            let ticks = tick(interval);
            let mut count = 0u64;
            loop {
                select! {
                    recv(ticks) -> _ => {
                        count += 1;
                        events.emit(TickEvent::new(count));
                        scene.lock().tick_components();
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
            tracing::debug!(ticks = count, "tick scheduler stopped");
        })?;
        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Signal the thread and wait for the in-flight tick to finish.
    pub(crate) fn stop(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("tick thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_ecs::{Component, GameObject};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Instant;

    struct Counter(Arc<AtomicUsize>);

    impl Component for Counter {
        fn on_tick(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn ticks_emit_events_and_run_hooks() {
        let hooks = Arc::new(AtomicUsize::new(0));
        let mut scene = Scene::new("ticks");
        scene
            .add(GameObject::new("counter").with(Counter(hooks.clone())))
            .unwrap();
        let scene = Arc::new(Mutex::new(scene));

        let events = Arc::new(EventManager::new());
        let last = Arc::new(AtomicU64::new(0));
        let l = last.clone();
        events.on(move |e: &mut TickEvent| l.store(e.tick, Ordering::SeqCst));

        let interval = Duration::from_millis(2);
        let mut ticker = Ticker::spawn("test-tick".into(), interval, scene, events).unwrap();
        wait_for(|| hooks.load(Ordering::SeqCst) >= 3);
        ticker.stop();

        let ticks = last.load(Ordering::SeqCst);
        assert!(ticks >= 3);
        assert_eq!(hooks.load(Ordering::SeqCst) as u64, ticks);
    }

    #[test]
    fn stop_halts_ticking() {
        let scene = Arc::new(Mutex::new(Scene::new("idle")));
        let events = Arc::new(EventManager::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        events.on(move |_: &mut TickEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let interval = Duration::from_millis(1);
        let ticker = Ticker::spawn("test-stop".into(), interval, scene, events).unwrap();
        wait_for(|| count.load(Ordering::SeqCst) >= 1);
        drop(ticker);
        let after = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after);
    }
}
