use std::time::Duration;

use tokio::sync::watch;

/// Resolve once cancellation has been requested.
///
/// Never resolves if the sending side is dropped without cancelling.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Sleep for `delay`, returns true if cancelled during the wait
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
