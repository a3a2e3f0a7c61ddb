//! Foreground inactivity watch.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use inms_client::{auth_context, ActivityEvent};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::debug;

/// Stdin lines, read on a detached thread so exit never waits on input.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the activity monitor until the session ends.
///
/// Each stdin line is a key press. Stops on expiry, on any other logout
/// that moves the route, on end of input, or on Ctrl-C.
pub async fn watch(format: &OutputFormat) -> Result<()> {
    let ctx = auth_context();
    if !ctx.session().is_authenticated() {
        anyhow::bail!("Not logged in. Run 'inms login' first");
    }

    let mut routes = ctx.routes().subscribe();
    let (monitor, handle) = ctx.start_activity_monitor();

    if let OutputFormat::Text = format {
        println!(
            "Watching for inactivity ({}s window). Press Enter to stay signed in, Ctrl-C to stop.",
            monitor.window().as_secs()
        );
    }

    let mut lines = stdin_lines();
    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(_) => {
                    if monitor.record_activity(ActivityEvent::KeyDown) {
                        debug!(remaining_secs = monitor.remaining().as_secs(), "Activity recorded");
                    }
                }
                None => break,
            },
            changed = routes.changed() => {
                if changed.is_err() || !ctx.session().is_authenticated() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.stop();

    if monitor.is_expired() {
        output::print_success("Session expired after inactivity. Signed out.", format);
    } else if !ctx.session().is_authenticated() {
        output::print_success("Session ended. Signed out.", format);
    } else {
        output::print_success("Stopped watching. Session is still active.", format);
    }
    Ok(())
}
