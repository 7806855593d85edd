//! Signal watcher.
//!
//! SIGINT and SIGTERM are received on a dedicated thread running a
//! current-thread tokio runtime.  A signal only cancels the shutdown
//! token; the supervisor in `main` notices the cancellation and performs
//! the ordered shutdown.  The watcher also exits, without a signal name,
//! when the token is cancelled by anyone else.

use std::io;
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Start the watcher.  The handle yields the name of the signal that
/// cancelled `token`, or `None` if it was cancelled some other way.
pub fn spawn_watcher(token: CancellationToken) -> io::Result<JoinHandle<Option<&'static str>>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Register on the caller's thread so a signal arriving before the
    // watcher thread is scheduled is not lost.
    let (mut interrupt, mut terminate) = {
        let _guard = rt.enter();
        (signal(SignalKind::interrupt())?, signal(SignalKind::terminate())?)
    };

    thread::Builder::new()
        .name("asteroid-signals".into())
        .spawn(move || {
            rt.block_on(async {
                let name = tokio::select! {
                    _ = interrupt.recv() => Some("SIGINT"),
                    _ = terminate.recv() => Some("SIGTERM"),
                    () = token.cancelled() => None,
                };
                match name {
                    Some(sig) => {
                        warn!("Received {}, shutting down", sig);
                        token.cancel();
                    }
                    None => debug!("signal watcher released"),
                }
                name
            })
        })
}
