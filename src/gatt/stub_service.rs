//! Service B: registers an application but publishes no attributes.

use log::{debug, info};

use crate::app::ports::RadioStack;
use crate::gatt::events::GattsEvent;
use crate::gatt::registry::{GattContext, ServicePhase, ServiceRecord};

pub fn handle<S: RadioStack>(record: &mut ServiceRecord, event: &GattsEvent<'_>, _ctx: &mut GattContext<'_, S>) {
    match *event {
        GattsEvent::Registered { app_id, .. } if !record.is_disabled() => {
            info!(
                "SVC B: registered (app_id={}, interface={:?}), no attributes",
                app_id,
                record.interface.map(|i| i.0)
            );
            record.phase = ServicePhase::Serving;
        }
        _ => debug!("SVC B: {:?} ignored", event),
    }
}
