//! Headless scripting front end for tn3270r
//!
//! Speaks the line-oriented peer protocol on stdin/stdout: one action call
//! per input line, one `data:`/status/ok-or-error reply per command. The
//! network transport attaches separately; this binary owns the session and
//! the event loop.

use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use anyhow::{bail, Result};

use tn3270r::events::{Event, PollEvents};
use tn3270r::script::ScriptReader;
use tn3270r::{Profile, Session};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mut profile_path: Option<PathBuf> = None;
    let mut model_override: Option<u8> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--profile" => {
                if i + 1 < args.len() {
                    profile_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    bail!("--profile requires a path");
                }
            }
            "--model" | "-m" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<u8>() {
                        Ok(m @ 2..=5) => model_override = Some(m),
                        _ => bail!("--model requires a number from 2 to 5"),
                    }
                    i += 1;
                } else {
                    bail!("--model requires a value");
                }
            }
            "--help" | "-h" => {
                println!("usage: tn3270r [--profile PATH] [--model N]");
                println!("Reads action commands on stdin, one per line;");
                println!("replies with data lines, a status line, and ok/error.");
                return Ok(());
            }
            other => bail!("unknown option: {other}"),
        }
        i += 1;
    }

    let mut profile = match profile_path {
        Some(path) => Profile::load(&path)?,
        None => Profile::load_default(),
    };
    if let Some(model) = model_override {
        profile.model = model;
    }

    let events = PollEvents::new();
    let mut session = Session::new(profile, Box::new(events.clone()));

    let stdin_fd = std::io::stdin().as_raw_fd();
    session.push_peer(
        Box::new(std::io::stdout()),
        Some((stdin_fd, ScriptReader::Stdin)),
    );

    while session.has_peer() {
        if events.is_idle() {
            // Nothing to wait on: the peer watch was the last registration,
            // so this only happens when stdin closed.
            break;
        }
        for event in events.poll() {
            match event {
                Event::Timer(id) => session.handle_timer(id),
                Event::Input(id) => session.on_input_ready(id),
            }
        }
    }

    for line in session.take_console() {
        eprintln!("{line}");
    }
    Ok(())
}
