/*!
 * Tense Host - Main Entry Point
 *
 * Joins a tense experiment, checks its health and leaves again:
 * - initialise the device
 * - report health if initialisation worked
 * - destroy unconditionally
 */

use std::process::ExitCode;
use tracing::{error, info};

use tense_lifecycle::runtime;

fn main() -> ExitCode {
    let runtime = match runtime::init_from_env() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return ExitCode::FAILURE;
        }
    };

    info!(
        device = %runtime.config().device.path.display(),
        dilation = %runtime.config().device.dilation,
        "Tense host starting"
    );

    let host = runtime.host();

    let initialised = host.initialise();
    if initialised {
        let status = host.health_check();
        info!(status = %status, healthy = status.is_healthy(), "Tense health check");

        let stats = host.manager().stats();
        match serde_json::to_string(&stats) {
            Ok(json) => info!(stats = %json, "Lifecycle statistics"),
            Err(e) => error!(error = %e, "Could not serialize lifecycle statistics"),
        }
    } else {
        error!("Tense initialisation failed");
    }

    let destroyed = host.destroy();
    if !destroyed {
        error!("Tense destroy failed");
    }

    info!(uptime_ms = runtime.uptime().as_millis() as u64, "Tense host exiting");

    if initialised && destroyed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
