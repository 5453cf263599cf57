use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use fn_adapter::config::{AppState, Config};
use fn_adapter::handler::{echo::echo, handler_fn};
use fn_adapter::logger;
use fn_adapter::server::{
    create_reusable_listener, start_server_loop, start_signal_handler, SignalHandler,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Single-threaded scheduling; requests interleave only at await points
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals))?;

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(AppState::new(cfg, handler_fn(echo)));
    start_server_loop(
        listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        Arc::clone(&signals.shutdown),
    )
    .await;

    Ok(())
}
