//! gitlet CLI — verb dispatch and console formatting.
//!
//! The interface is a fixed line-oriented protocol: every failure prints
//! its single canonical message on standard output and the process exits
//! normally. The `checkout` verb carries a literal `--` operand separating
//! it from ordinary flag handling, so operands are dispatched raw.

use std::env;

use gitlet_core::commit::Commit;
use gitlet_core::merge::MergeSummary;
use gitlet_core::repo::{ModificationKind, StatusReport};
use gitlet_core::{GitletError, GitletResult, Repository};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        println!("{e}");
    }
}

fn run(args: &[String]) -> GitletResult<()> {
    let Some(verb) = args.first() else {
        return Err(GitletError::NoCommand);
    };
    let operands = &args[1..];
    let cwd = env::current_dir()?;

    match verb.as_str() {
        "init" => {
            expect_operands(operands, 0)?;
            Repository::init(&cwd)?;
            Ok(())
        }
        "add" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.add(&operands[0])
        }
        "commit" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.commit(&operands[0])?;
            Ok(())
        }
        "rm" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.rm(&operands[0])
        }
        "log" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 0)?;
            for (hash, commit) in repo.log()? {
                println!("{}", format_log_record(&hash, &commit));
            }
            Ok(())
        }
        "global-log" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 0)?;
            for (hash, commit) in repo.global_log()? {
                println!("{}", format_log_record(&hash, &commit));
            }
            Ok(())
        }
        "find" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            let hashes = repo.find(&operands[0])?;
            if hashes.is_empty() {
                println!("Found no commit with that message.");
            }
            for hash in hashes {
                println!("{hash}");
            }
            Ok(())
        }
        "status" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 0)?;
            print!("{}", format_status(&repo.status()?));
            Ok(())
        }
        "checkout" => {
            let repo = Repository::open(&cwd)?;
            match operands {
                [flag, file] if flag == "--" => repo.checkout_file(file),
                [prefix, flag, file] if flag == "--" => repo.checkout_file_at(prefix, file),
                [branch] => repo.checkout_branch(branch),
                _ => Err(GitletError::BadArgs),
            }
        }
        "branch" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.branch(&operands[0])
        }
        "rm-branch" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.rm_branch(&operands[0])
        }
        "reset" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.reset(&operands[0])
        }
        "merge" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            let summary = repo.merge(&operands[0])?;
            report_merge(&summary);
            Ok(())
        }
        "add-remote" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 2)?;
            repo.add_remote(&operands[0], &operands[1])
        }
        "rm-remote" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 1)?;
            repo.rm_remote(&operands[0])
        }
        "push" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 2)?;
            repo.push(&operands[0], &operands[1])
        }
        "fetch" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 2)?;
            repo.fetch(&operands[0], &operands[1])
        }
        "pull" => {
            let repo = Repository::open(&cwd)?;
            expect_operands(operands, 2)?;
            let summary = repo.pull(&operands[0], &operands[1])?;
            report_merge(&summary);
            Ok(())
        }
        _ => Err(GitletError::UnknownCommand),
    }
}

fn expect_operands(operands: &[String], len: usize) -> GitletResult<()> {
    if operands.len() != len {
        return Err(GitletError::BadArgs);
    }
    Ok(())
}

fn report_merge(summary: &MergeSummary) {
    if summary.conflict {
        println!("Encountered a merge conflict.");
    }
    if summary.no_changes {
        println!("No changes added to the commit.");
    }
}

/// One log record. Ends with a newline, so printing it with `println!`
/// leaves the blank separator line after each record.
fn format_log_record(hash: &str, commit: &Commit) -> String {
    let mut out = String::new();
    out.push_str("===\n");
    out.push_str(&format!("commit {hash}\n"));
    if commit.is_merge() {
        if let (Some(p0), Some(p1)) = (commit.parent(0), commit.parent(1)) {
            out.push_str(&format!("Merge: {} {}\n", &p0[..7], &p1[..7]));
        }
    }
    out.push_str(&format!("Date: {}\n", commit.date_string()));
    out.push_str(&commit.message);
    out.push('\n');
    out
}

fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    out.push_str("=== Branches ===\n");
    for branch in &report.branches {
        if *branch == report.current_branch {
            out.push('*');
        }
        out.push_str(branch);
        out.push('\n');
    }
    out.push_str("\n=== Staged Files ===\n");
    for name in &report.staged {
        out.push_str(name);
        out.push('\n');
    }
    out.push_str("\n=== Removed Files ===\n");
    for name in &report.removed {
        out.push_str(name);
        out.push('\n');
    }
    out.push_str("\n=== Modifications Not Staged For Commit ===\n");
    for (name, kind) in &report.modifications {
        let tag = match kind {
            ModificationKind::Modified => "modified",
            ModificationKind::Deleted => "deleted",
        };
        out.push_str(&format!("{name} ({tag})\n"));
    }
    out.push_str("\n=== Untracked Files ===\n");
    for name in &report.untracked {
        out.push_str(name);
        out.push('\n');
    }
    out
}
