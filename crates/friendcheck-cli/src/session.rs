//! Session front end: batch flags or an interactive prompt.

use anyhow::Result;
use friendcheck_core::{
    enrollment_progress, EnrollmentResult, Session, VerificationOutcome, WorkflowError,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Enroll(PathBuf),
    Check(PathBuf),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let path = || {
        if rest.is_empty() {
            Err(format!("usage: {verb} PATH"))
        } else {
            Ok(PathBuf::from(rest))
        }
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "enroll" | "add" => Command::Enroll(path()?),
        "check" | "verify" => Command::Check(path()?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?}; try \"help\"")),
    };
    Ok(Some(command))
}

const HELP: &str = "commands:\n  enroll PATH   teach the robot a friend's face\n  check PATH    \
                    is this my friend?\n  status        show session state\n  quit";

/// Something worth telling the user.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    Started {
        collection: &'a str,
    },
    Enrolled {
        path: &'a Path,
        result: EnrollmentResult,
        enrolled: u32,
        message: &'a str,
    },
    Checked {
        path: &'a Path,
        #[serde(flatten)]
        outcome: &'a VerificationOutcome,
        message: &'a str,
    },
    Failed {
        path: &'a Path,
        message: &'a str,
        detail: String,
    },
    Status {
        collection: &'a str,
        state: String,
        enrolled: u32,
    },
}

pub struct Reporter {
    pub json: bool,
}

impl Reporter {
    pub fn emit(&self, event: &Event<'_>) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to encode event"),
            }
            return;
        }
        match event {
            Event::Started { collection } => {
                println!("Session started (collection {collection}).");
                println!("{}", enrollment_progress(0));
            }
            Event::Enrolled {
                path,
                result,
                enrolled,
                message,
            } => {
                println!("{}: {message}", path.display());
                if matches!(result, EnrollmentResult::FacesIndexed(_)) {
                    println!("{}", enrollment_progress(*enrolled));
                }
            }
            Event::Checked { path, message, .. } => println!("{}: {message}", path.display()),
            Event::Failed {
                path,
                message,
                detail,
            } => println!("{}: {message} ({detail})", path.display()),
            Event::Status {
                collection,
                state,
                enrolled,
            } => println!("collection {collection}: {state}, {enrolled} photo(s) enrolled"),
        }
    }
}

async fn enroll(session: &Session, reporter: &Reporter, path: &Path) {
    match session.enroll_path(path).await {
        Ok(result) => reporter.emit(&Event::Enrolled {
            path,
            result,
            enrolled: session.enrolled_count(),
            message: result.message(),
        }),
        Err(e) => report_failure(reporter, path, &e),
    }
}

async fn check(session: &Session, reporter: &Reporter, path: &Path) {
    match session.verify_path(path).await {
        Ok(outcome) => reporter.emit(&Event::Checked {
            path,
            outcome: &outcome,
            message: outcome.message(),
        }),
        Err(e) => report_failure(reporter, path, &e),
    }
}

fn report_failure(reporter: &Reporter, path: &Path, error: &WorkflowError) {
    tracing::warn!(path = %path.display(), error = %error, "step failed; try again");
    reporter.emit(&Event::Failed {
        path,
        message: error.user_message(),
        detail: error.to_string(),
    });
}

/// Start the session, or explain that a new one is needed.
pub async fn start(session: &Session, reporter: &Reporter) -> Result<()> {
    if let Err(e) = session.start().await {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    reporter.emit(&Event::Started {
        collection: session.collection_id().as_str(),
    });
    Ok(())
}

pub async fn run_batch(
    session: &Session,
    reporter: &Reporter,
    enroll_paths: &[PathBuf],
    check_paths: &[PathBuf],
) {
    for path in enroll_paths {
        enroll(session, reporter, path).await;
    }
    for path in check_paths {
        check(session, reporter, path).await;
    }
}

pub async fn run_interactive(session: &Session, reporter: &Reporter) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Enroll(path))) => enroll(session, reporter, &path).await,
            Ok(Some(Command::Check(path))) => check(session, reporter, &path).await,
            Ok(Some(Command::Status)) => reporter.emit(&Event::Status {
                collection: session.collection_id().as_str(),
                state: session.state().await.to_string(),
                enrolled: session.enrolled_count(),
            }),
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(Some(Command::Quit)) => return Ok(()),
            Err(usage) => println!("{usage}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friendcheck_core::ConfidenceTier;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(
            parse_command("enroll  /tmp/my friend.jpg "),
            Ok(Some(Command::Enroll(PathBuf::from("/tmp/my friend.jpg"))))
        );
        assert_eq!(
            parse_command("CHECK probe.png"),
            Ok(Some(Command::Check(PathBuf::from("probe.png"))))
        );
        assert_eq!(parse_command("status"), Ok(Some(Command::Status)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_rejects_missing_path_and_unknown() {
        assert_eq!(parse_command("enroll"), Err("usage: enroll PATH".to_string()));
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_checked_event_json_is_flat() {
        let outcome = VerificationOutcome::Match {
            tier: ConfidenceTier::Medium,
            similarity: 80.0,
            face_id: None,
        };
        let event = Event::Checked {
            path: Path::new("p.jpg"),
            outcome: &outcome,
            message: outcome.message(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "checked");
        assert_eq!(json["outcome"], "match");
        assert_eq!(json["tier"], "medium");
        assert_eq!(json["path"], "p.jpg");
    }
}
