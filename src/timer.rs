// Periodic timer interface used by the scheduler
use spin::Mutex;

/// Function run on every timer interrupt.
pub type TickCallback = fn();

/// A periodic interrupt source.
pub trait Timer {
    /// Program the interrupt rate. Called once at boot.
    fn set_frequency(&mut self, hz: u32);

    /// Run `callback` on every interrupt from now on.
    fn register_callback(&mut self, callback: TickCallback);
}

static CALLBACK: Mutex<Option<TickCallback>> = Mutex::new(None);

/// Store the callback run by [`dispatch`].
pub fn set_callback(callback: TickCallback) {
    *CALLBACK.lock() = Some(callback);
}

/// Run the registered callback, if any. Called from the timer interrupt handler.
///
/// The callback may switch to another process, so it runs after the
/// registration lock has been released.
pub fn dispatch() {
    let callback = *CALLBACK.lock();
    if let Some(callback) = callback {
        callback();
    }
}
