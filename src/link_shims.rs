//! Runtime symbol providers for third-party crates.
//!
//! `async-io-mini` timers resolve `_embassy_time_now` and
//! `_embassy_time_schedule_wake` at link time.  On ESP-IDF the clock is
//! `esp_timer` and `critical-section` is backed by a process-wide mutex; on
//! the host the clock is a monotonic [`Instant`](std::time::Instant) and the
//! critical section comes from the `critical-section/std` implementation.
//!
//! Ticks are microseconds (`embassy-time-driver`'s default 1 MHz tick rate).

use core::task::Waker;
use core::time::Duration;

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

// ───────────────────────────────────────────────────────────────
// Critical section (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Re-entrant acquire for the `CriticalSectionRawMutex` message queues,
/// which are shared with the MQTT callback thread.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                // The guarded data is `()`, so a poisoned lock is still usable.
                let lock = CRITICAL_SECTION_MUTEX
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                *guard.borrow_mut() = Some(lock);
            }
            let nested = d.saturating_add(1);
            depth.set(nested);
            nested
        })
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        CRITICAL_SECTION_GUARD.with(|guard| {
            let d = depth.get();
            if d == 0 {
                return;
            }
            depth.set(d - 1);
            if d == 1 {
                *guard.borrow_mut() = None;
            }
        })
    })
}

// ───────────────────────────────────────────────────────────────
// Time driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn now_micros() -> u64 {
    // SAFETY: `esp_timer_get_time` has no preconditions once the IDF is up.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    u64::try_from(us).unwrap_or(0)
}

#[cfg(not(target_os = "espidf"))]
fn now_micros() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Current time in ticks since boot (host: since first call).
#[unsafe(no_mangle)]
fn _embassy_time_now() -> u64 {
    now_micros()
}

/// Wake `waker` once the clock reaches `at`.
///
/// Each registration gets a short-lived sleeper thread.  Timers in this
/// crate are few and long (status interval, settle delay, publish tick), so
/// no shared timer queue is kept.
#[unsafe(no_mangle)]
fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    let sleeper = waker.clone();
    let spawned = std::thread::Builder::new()
        .name("timer-wake".into())
        .stack_size(4 * 1024)
        .spawn(move || {
            let now = now_micros();
            if at > now {
                std::thread::sleep(Duration::from_micros(at - now));
            }
            sleeper.wake();
        });
    if let Err(e) = spawned {
        // Without a sleeper the timer would never fire; wake now so the
        // owner re-polls and re-registers.
        log::warn!("timer: wake thread spawn failed ({}), waking early", e);
        waker.wake_by_ref();
    }
}
