//! Demo binary wiring a mock polling API client and the `ping` module
//! into the driver loop.

mod mock_api;
mod modules;

use mock_api::MockApiClient;
use modules::ping::PingModule;
use ringconfig::BotConfig;
use ringdispatch::{ApiClient, Driver, ModuleRegistry};
use ringqueue::Ring;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    let cfg = BotConfig::from_env();
    println!(
        "botring: starting — sq_entries={} min_threads={} max_threads={} max_pending={} log_level={}",
        cfg.sq_entries, cfg.min_threads, cfg.max_threads, cfg.max_pending, cfg.log_level
    );

    let ring = Ring::init_with_workqueue(
        cfg.sq_entries,
        cfg.min_threads,
        cfg.max_threads,
        cfg.max_pending,
    );
    println!(
        "botring: ring initialized — sq_capacity={} cq_capacity={}",
        ring.sq_capacity(),
        ring.cq_capacity()
    );

    let api: Arc<dyn ApiClient> = Arc::new(MockApiClient::new(
        vec![
            vec![(1001, String::from("/ping"))],
            vec![(1001, String::from("hello, bot"))],
            vec![(1002, String::from("!ping"))],
        ],
        cfg.poll_interval_ms,
    ));

    let modules = ModuleRegistry::new(vec![Box::new(PingModule)]);
    let driver = Arc::new(Driver::new(ring.clone(), api, modules));

    let loop_driver = driver.clone();
    let loop_handle = thread::spawn(move || loop_driver.run());

    // Demo run: let the scripted conversation play out, then shut
    // down cleanly. A long-running deployment would instead wait on a
    // signal handler here.
    thread::sleep(Duration::from_millis(500));
    ring.destroy();
    loop_handle.join().expect("driver loop thread panicked");

    println!("botring: shut down cleanly");
}
