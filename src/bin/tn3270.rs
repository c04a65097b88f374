//! Minimal TN3270(E) client: connects, negotiates, and prints the decoded
//! screen every time the host writes one. Exits on session close or
//! Ctrl-C.

use std::env;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use tn3270rs::config::{self, SessionConfig};
use tn3270rs::session::{Session, SessionEvent};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_sigint_handler() {
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_sigint_handler() {}

fn parse_target(s: &str) -> Result<(String, u16)> {
    match s.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), port.parse().context("invalid port")?)),
        None => Ok((s.to_string(), 23)),
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    install_sigint_handler();

    let target = env::args().nth(1).context("usage: tn3270 <host>[:port]")?;
    let (host, port) = parse_target(&target)?;

    let config = SessionConfig::new(config::default_config_path().to_string_lossy().to_string(), "tn3270-cli".to_string());

    let mut session = Session::connect(&host, port, &config).with_context(|| format!("connecting to {host}:{port}"))?;
    log::info!("connected to {host}:{port}");

    loop {
        if INTERRUPTED.load(Ordering::SeqCst) {
            log::info!("interrupt received, closing session");
            session.close();
        }

        match session.wait(Duration::from_millis(500)) {
            Ok(SessionEvent::HostWrite) | Ok(SessionEvent::KeyboardUnlocked) => {
                println!("{}", session.screen_text());
            }
            Ok(SessionEvent::Idle) => {}
            Ok(SessionEvent::Closed(None)) => {
                log::info!("session closed");
                return Ok(ExitCode::SUCCESS);
            }
            Ok(SessionEvent::Closed(Some(e))) => {
                log::error!("session closed: {e}");
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => {
                log::error!("session error: {e}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
}
