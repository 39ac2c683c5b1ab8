use color_eyre::Result;
use gamepad_reader::config::ReaderSettings;
use gamepad_reader::device::TARGET_DEVICE;
use gamepad_reader::poller::StopReason;
use gamepad_reader::presentation::ConsoleSink;
use gamepad_reader::reader::ReaderHandle;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    setup()?;

    let settings = ReaderSettings::load().await?;

    // Locate + negotiate; failures end the process before polling
    let reader = match ReaderHandle::open(TARGET_DEVICE, &settings) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to open gamepad: {}", e);
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("{}", reader.summary());
    println!("Device setup complete");
    println!("\nReading input data... Press Ctrl+C to stop.");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                interrupt.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl+C: {}", e),
        }
    });

    let sink = Box::new(ConsoleSink::new(settings.display.clone()));
    let reason = reader.run(sink, cancel).await?;

    Ok(match reason {
        StopReason::Cancelled => ExitCode::SUCCESS,
        StopReason::TransferFailed(detail) => {
            error!("Polling stopped after transfer failure: {}", detail);
            ExitCode::FAILURE
        }
    })
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

// Logs go to stderr; stdout belongs to the report display
fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
