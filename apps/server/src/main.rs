use hooklift::BootstrapError;
use hooklift_server::{Server, logger, preload_settings};

#[hooklift_runtime::main(cooperative)]
async fn main() -> anyhow::Result<()> {
    let settings = preload_settings()?;
    let _log = logger(env!("CARGO_PKG_NAME"), &settings.log)?.init()?;

    match Server::builder().build().await {
        Ok(server) => server.run().await,
        Err(err) => {
            let cause = err.downcast_ref::<BootstrapError>();
            if let Some(timeout) = cause.filter(|e| e.is_readiness_timeout()) {
                tracing::error!(pending = ?timeout.pending_hooks(), "Readiness watchdog fired, exiting");
            }
            Err(err)
        },
    }
}
