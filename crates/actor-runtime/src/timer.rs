//! # Timers
//!
//! One-shot delayed callbacks spawned on a tokio runtime. A timer is cancelled
//! when stopped or dropped. Callbacks are expected to do nothing more than
//! message an actor, so a cancellation racing with the callback is harmless.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A cancellable one-shot timer.
#[derive(Debug, Default)]
pub struct Timer {
    task: Option<JoinHandle<()>>,
}

impl Timer {
    /// Fires `callback` once after `delay`.
    pub fn start<F>(runtime: &Handle, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            sleep_for(delay).await;
            callback();
        });
        Self { task: Some(task) }
    }

    /// Fires `callback` once after `delay`, or as soon as `wake` changes to
    /// `true`, whichever comes first.
    pub fn start_or_wake<F>(
        runtime: &Handle,
        delay: Duration,
        mut wake: watch::Receiver<bool>,
        callback: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            let woken = async move {
                // Only a transition counts, not the value at arming time.
                let _ = wake.borrow_and_update();
                loop {
                    if wake.changed().await.is_err() {
                        // Signal source is gone; only the delay remains.
                        std::future::pending::<()>().await;
                    }
                    if *wake.borrow_and_update() {
                        break;
                    }
                }
            };
            tokio::select! {
                _ = sleep_for(delay) => {}
                _ = woken => {}
            }
            callback();
        });
        Self { task: Some(task) }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the timer is armed and has not fired yet.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sleep_for(delay: Duration) {
    match Instant::now().checked_add(delay) {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = Timer::start(&Handle::current(), Duration::from_secs(10), move || {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(timer.is_active());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_timer_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = Timer::start(&Handle::current(), Duration::from_secs(1), move || {
            flag.store(true, Ordering::SeqCst);
        });
        drop(timer);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_signal_fires_early() {
        let (wake_tx, wake_rx) = watch::channel(false);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let _timer = Timer::start_or_wake(
            &Handle::current(),
            Duration::from_secs(3600),
            wake_rx,
            move || flag.store(true, Ordering::SeqCst),
        );

        tokio::task::yield_now().await;
        assert!(!fired.load(Ordering::SeqCst));

        wake_tx.send_replace(true);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_ignores_value_at_arming_time() {
        let (_wake_tx, wake_rx) = watch::channel(true);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let _timer = Timer::start_or_wake(
            &Handle::current(),
            Duration::from_secs(10),
            wake_rx,
            move || flag.store(true, Ordering::SeqCst),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
