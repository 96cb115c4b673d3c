use std::sync::Once;

use log::LevelFilter;

static LOGGER_INIT: Once = Once::new();

// Set up a logger that logs all log messages with `level` and above. Safe to call from every test.
pub(crate) fn setup_logger(level: LevelFilter) {
    LOGGER_INIT.call_once(|| {
        // Another test binary may have installed a logger first.
        let _ = brb_rs::logging::init_logger(level);
    })
}
