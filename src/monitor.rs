use embassy_executor::{SpawnError, Spawner};
use esp_hal::gpio::Input;

use crate::{
    config::{CREDENTIALS_READY, PROV_EVENTS, PROV_OUTCOME},
    tag::{TagNdef, GPO_PROVISIONING_CONFIG},
    types::ProvEvent,
};

/// Best-effort enqueue from the edge-trigger context: no blocking, no
/// allocation. Returns false when the queue was full and the event dropped.
pub fn enqueue_event(event: ProvEvent) -> bool {
    PROV_EVENTS.try_send(event).is_ok()
}

/// Watches the tag's GPO line and forwards each pulse to the credential
/// listener, classified by what the line is doing when the task wakes.
#[embassy_executor::task]
pub async fn gpo_monitor_task(mut gpo: Input<'static>) {
    loop {
        gpo.wait_for_falling_edge().await;
        // The line stays low for the duration of an RF command session; a
        // pulse that has already cleared is field traffic without a write.
        let event = if gpo.is_low() {
            ProvEvent::TagWritten
        } else {
            ProvEvent::FieldActivity
        };
        let _ = enqueue_event(event);
        // Re-arm on level return so held-low periods don't starve next edge.
        if gpo.is_low() {
            gpo.wait_for_rising_edge().await;
        }
    }
}

/// Idempotent subsystem reset: drains stale events and credentials, clears
/// any unobserved outcome, and configures the tag's GPO line to pulse on RF
/// write activity.
pub fn initialize<T: TagNdef>(tag: &mut T) -> Result<(), T::Error> {
    while PROV_EVENTS.try_receive().is_ok() {}
    while CREDENTIALS_READY.try_receive().is_ok() {}
    PROV_OUTCOME.reset();
    tag.configure_gpo(GPO_PROVISIONING_CONFIG)
}

/// Begin listening for tag writes on `gpo`, a falling-edge input wired to
/// the tag chip's GPO pin.
pub fn arm_monitor(spawner: &Spawner, gpo: Input<'static>) -> Result<(), SpawnError> {
    spawner.spawn(gpo_monitor_task(gpo))
}
