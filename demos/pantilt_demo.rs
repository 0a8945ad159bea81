//! Windowed gimbal demo.
//!
//! Usage: `cargo run --example pantilt_demo -- [options.json] [capture_dir]`
//!
//! The gimbal feed is shown as an inset in the bottom-right corner of the
//! window. With a capture directory, every tenth gimbal frame is also written
//! there as PNG. Left drag orbits the main camera, right drag pans, the wheel
//! zooms, R restarts the speed profile, P hides the inset, F12 saves the
//! current gimbal frame and Escape quits.

use pantilt::*;

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let options = match args.next() {
        Some(path) => SimOptions::from_json_file(path)?,
        None => SimOptions::default(),
    };

    let preview = PreviewSink::new();
    let handle = preview.handle();
    let mut sink = FanoutSink::new().with(preview);
    if let Some(dir) = args.next() {
        sink.push(Box::new(ImageSequenceSink::new(dir, 10)?));
    }

    run_with_preview(options, Box::new(sink), handle)
}
