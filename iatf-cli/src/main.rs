//! Command-line interface for IATF files
//!
//! One-shot commands over a single file or a directory tree:
//!
//!   iatf rebuild <file>              Regenerate the index block in place
//!   iatf rebuild-all <dir>           Rebuild every .iatf file under a directory
//!   iatf validate <file>             Report all errors and warnings
//!   iatf index <file>                Print the index block
//!   iatf read <file> <id>            Print a section's exact line span
//!   iatf graph <file>                Print the cross-reference graph
//!   iatf watch <file> / unwatch      Poll a file and rebuild on change
//!   iatf daemon <start|stop|status>  Background rebuilds for configured paths
//!
//! Exit codes: 0 on success, 1 when a section or file query matches nothing,
//! 2 when the file is not valid IATF.

use clap::{Arg, ArgAction, Command};
use iatf_parser::iatf::engine;
use iatf_parser::iatf::index::{Clock, SystemClock};
use iatf_parser::iatf::service::{LocalDaemon, ServiceManager};
use iatf_parser::iatf::watch_state::{WatchInfo, WatchStateStore};
use iatf_parser::iatf::IatfError;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

fn main() {
    let matches = Command::new("iatf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Maintain section-addressable IATF documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("rebuild")
                .about("Regenerate the index block in place")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("rebuild-all")
                .about("Rebuild every .iatf file under a directory")
                .arg(Arg::new("dir").required(true)),
        )
        .subcommand(
            Command::new("validate")
                .about("Report every error and warning")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("index")
                .about("Print the index block")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("read")
                .about("Print a section's exact line span")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("section").required(true))
                .arg(
                    Arg::new("title")
                        .long("title")
                        .help("Match by title substring instead of ID")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("graph")
                .about("Print the cross-reference graph")
                .arg(Arg::new("file").required(true))
                .arg(
                    Arg::new("incoming")
                        .long("incoming")
                        .help("Show incoming edges instead of outgoing")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll a file and rebuild whenever it changes")
                .arg(Arg::new("file").required_unless_present("list"))
                .arg(
                    Arg::new("list")
                        .long("list")
                        .help("List watched files")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("unwatch")
                .about("Stop watching a file")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("daemon")
                .about("Background rebuilds for configured directories")
                .subcommand_required(true)
                .subcommand(Command::new("start").about("Run the daemon in the foreground"))
                .subcommand(Command::new("stop").about("Stop a running daemon"))
                .subcommand(Command::new("status").about("Show daemon state and watch paths")),
        )
        .get_matches();

    let code = match matches.subcommand() {
        Some(("rebuild", sub)) => rebuild(Path::new(required(sub, "file"))),
        Some(("rebuild-all", sub)) => rebuild_all(Path::new(required(sub, "dir"))),
        Some(("validate", sub)) => validate(Path::new(required(sub, "file"))),
        Some(("index", sub)) => index(Path::new(required(sub, "file"))),
        Some(("read", sub)) => read(
            Path::new(required(sub, "file")),
            required(sub, "section"),
            sub.get_flag("title"),
        ),
        Some(("graph", sub)) => graph(
            Path::new(required(sub, "file")),
            sub.get_flag("incoming"),
        ),
        Some(("watch", sub)) => {
            if sub.get_flag("list") {
                watch_list()
            } else {
                watch(Path::new(required(sub, "file")))
            }
        }
        Some(("unwatch", sub)) => unwatch(Path::new(required(sub, "file"))),
        Some(("daemon", sub)) => match sub.subcommand() {
            Some(("start", _)) => daemon_start(),
            Some(("stop", _)) => daemon_stop(),
            Some(("status", _)) => daemon_status(),
            _ => 2,
        },
        _ => 2,
    };
    exit(code);
}

fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Map an engine error to the documented exit codes.
fn exit_code(err: &IatfError) -> i32 {
    match err {
        IatfError::NotFound(_) => 1,
        IatfError::Format(_) | IatfError::Structure(_) => 2,
        IatfError::Reference(_) | IatfError::Consistency(_) | IatfError::Io(_) => 1,
    }
}

fn fail(err: IatfError) -> i32 {
    eprintln!("Error: {}", err);
    exit_code(&err)
}

fn rebuild(path: &Path) -> i32 {
    match engine::rebuild_file(path, &SystemClock) {
        Ok(true) => {
            println!("Rebuilt: {}", path.display());
            0
        }
        Ok(false) => {
            println!("Index already up to date: {}", path.display());
            0
        }
        Err(err) => fail(err),
    }
}

fn rebuild_all(dir: &Path) -> i32 {
    let outcomes = match engine::rebuild_dir(dir, &SystemClock) {
        Ok(outcomes) => outcomes,
        Err(err) => return fail(err),
    };
    if outcomes.is_empty() {
        println!("No .iatf files under {}", dir.display());
        return 0;
    }
    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(true) => println!("Rebuilt: {}", outcome.path.display()),
            Ok(false) => println!("Up to date: {}", outcome.path.display()),
            Err(err) => {
                failures += 1;
                eprintln!("Failed: {}: {}", outcome.path.display(), err);
            }
        }
    }
    println!(
        "{} file(s), {} failure(s)",
        outcomes.len(),
        failures
    );
    if failures > 0 {
        1
    } else {
        0
    }
}

fn validate(path: &Path) -> i32 {
    let report = match engine::validate_file(path) {
        Ok(report) => report,
        Err(err) => return fail(err),
    };
    let errors = report.errors().count();
    for diagnostic in &report.diagnostics {
        println!("{}", diagnostic);
    }
    if errors == 0 {
        println!("Valid IATF file: {}", path.display());
        0
    } else {
        eprintln!("{} error(s) found", errors);
        1
    }
}

fn index(path: &Path) -> i32 {
    match engine::index_text_file(path) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(err) => fail(err),
    }
}

fn read(path: &Path, section: &str, by_title: bool) -> i32 {
    match engine::read_file(path, section, by_title) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(err) => fail(err),
    }
}

fn graph(path: &Path, show_incoming: bool) -> i32 {
    match engine::graph_text_file(path, show_incoming) {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(err) => fail(err),
    }
}

const WATCH_POLL: Duration = Duration::from_millis(250);

fn watch(path: &Path) -> i32 {
    let absolute = match path.canonicalize() {
        Ok(absolute) => absolute,
        Err(err) => return fail(IatfError::Io(format!("{}: {}", path.display(), err))),
    };
    let store = match WatchStateStore::default_location() {
        Ok(store) => store,
        Err(err) => return fail(err),
    };
    let mut last_seen = mtime(&absolute).unwrap_or(0.0);
    let registered = store.register(
        &absolute,
        WatchInfo {
            started: SystemClock.now(),
            last_modified: last_seen,
            pid: Some(std::process::id()),
        },
    );
    if let Err(err) = registered {
        return fail(err);
    }

    println!("Watching: {}", path.display());
    loop {
        std::thread::sleep(WATCH_POLL);
        match store.is_watched(&absolute) {
            Ok(true) => {}
            // Unwatched from another terminal, or the registry is unreadable.
            Ok(false) => return 0,
            Err(err) => return fail(err),
        }
        let Some(current) = mtime(&absolute) else { continue };
        if current > last_seen {
            last_seen = current;
            match engine::rebuild_file(&absolute, &SystemClock) {
                Ok(true) => println!("Rebuilt: {}", path.display()),
                Ok(false) => {}
                Err(err) => eprintln!("Error: {}", err),
            }
            // Pick up the mtime of our own write so it does not retrigger.
            if let Some(after) = mtime(&absolute) {
                last_seen = after;
            }
        }
    }
}

fn mtime(path: &Path) -> Option<f64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    Some(since_epoch.as_secs_f64())
}

fn watch_list() -> i32 {
    let store = match WatchStateStore::default_location() {
        Ok(store) => store,
        Err(err) => return fail(err),
    };
    let state = match store.load() {
        Ok(state) => state,
        Err(err) => return fail(err),
    };
    if state.is_empty() {
        println!("No files are being watched");
        return 0;
    }
    for (path, info) in &state {
        match info.pid {
            Some(pid) => println!("{} (PID {}, since {})", path, pid, info.started),
            None => println!("{} (since {})", path, info.started),
        }
    }
    0
}

fn unwatch(path: &Path) -> i32 {
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let store = match WatchStateStore::default_location() {
        Ok(store) => store,
        Err(err) => return fail(err),
    };
    match store.unregister(&absolute) {
        Ok(true) => {
            println!("Stopped watching: {}", path.display());
            0
        }
        Ok(false) => {
            eprintln!("Not watched: {}", path.display());
            1
        }
        Err(err) => fail(err),
    }
}

const DAEMON_POLL: Duration = Duration::from_secs(2);

fn daemon_start() -> i32 {
    let daemon = match LocalDaemon::default_location() {
        Ok(daemon) => daemon,
        Err(err) => return fail(err),
    };
    let config = match daemon.load_config() {
        Ok(config) => config,
        Err(err) => return fail(err),
    };
    if config.watch_paths.is_empty() {
        eprintln!("No watch paths configured.");
        eprintln!("Add paths to {}", daemon.config_path().display());
        return 1;
    }
    if let Ok(status) = daemon.status() {
        if status.running {
            eprintln!("Daemon already running (PID {})", status.pid.unwrap_or(0));
            return 1;
        }
    }
    let pid = std::process::id();
    if let Err(err) = daemon.install(pid) {
        return fail(err);
    }
    println!("Daemon running (PID {}), watching {} path(s)", pid, config.watch_paths.len());

    loop {
        for dir in &config.watch_paths {
            let dir = PathBuf::from(dir);
            match engine::rebuild_dir(&dir, &SystemClock) {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome.result {
                            Ok(true) => println!("Rebuilt: {}", outcome.path.display()),
                            Ok(false) => {}
                            Err(err) => eprintln!("Failed: {}: {}", outcome.path.display(), err),
                        }
                    }
                }
                Err(err) => eprintln!("Error scanning {}: {}", dir.display(), err),
            }
        }
        std::thread::sleep(DAEMON_POLL);
        match daemon.status() {
            // Stopped via `daemon stop` from another terminal.
            Ok(status) if status.pid != Some(pid) => return 0,
            Ok(_) => {}
            Err(err) => return fail(err),
        }
    }
}

fn daemon_stop() -> i32 {
    let daemon = match LocalDaemon::default_location() {
        Ok(daemon) => daemon,
        Err(err) => return fail(err),
    };
    match daemon.status() {
        Ok(status) if status.pid.is_some() => {
            if let Err(err) = daemon.uninstall() {
                return fail(err);
            }
            println!("Daemon stopped");
            0
        }
        Ok(_) => {
            eprintln!("Daemon is not running");
            1
        }
        Err(err) => fail(err),
    }
}

fn daemon_status() -> i32 {
    let daemon = match LocalDaemon::default_location() {
        Ok(daemon) => daemon,
        Err(err) => return fail(err),
    };
    match daemon.status() {
        Ok(status) => {
            match (status.running, status.pid) {
                (true, Some(pid)) => println!("Daemon running (PID {})", pid),
                (false, Some(pid)) => println!("Daemon not running (stale PID {})", pid),
                _ => println!("Daemon not running"),
            }
            if status.watch_paths.is_empty() {
                println!("No watch paths configured");
            } else {
                println!("Watch paths:");
                for path in &status.watch_paths {
                    println!("  {}", path);
                }
            }
            0
        }
        Err(err) => fail(err),
    }
}
