//! Replay entry point (native).

#[cfg(feature = "native")]
fn main() {
    use clap::Parser;
    use driftboard_app::{ReplayOptions, run};

    env_logger::init();

    let options = ReplayOptions::parse();

    log::info!("Replaying {} on canvas {}", options.script.display(), options.canvas_id);
    if let Err(e) = pollster::block_on(run(&options)) {
        log::error!("replay failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
