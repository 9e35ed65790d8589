//! Command-line dispatch.
//!
//! One command per invocation, mapping 1:1 onto repository controller
//! operations. All domain failures are reported on stdout and the
//! process still exits zero; only hard I/O or corruption failures exit
//! non-zero. The workspace state is checkpointed after every mutating
//! command.

use std::path::Path;
use std::process::ExitCode;

use crate::storage::{BranchName, MergeOutcome, StorageError, StorageResult};
use crate::workspace::Workspace;

/// run a command against the current directory
pub fn run(args: &[String]) -> ExitCode {
    run_in(Path::new("."), args)
}

/// run a command against an explicit working directory
pub fn run_in(root: &Path, args: &[String]) -> ExitCode {
    let Some((command, operands)) = args.split_first() else {
        println!("Please enter a command");
        return ExitCode::SUCCESS;
    };

    if command == "init" {
        if !operands.is_empty() {
            println!("Incorrect operands.");
            return ExitCode::SUCCESS;
        }
        return match Workspace::init(root) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => report(&e),
        };
    }

    let workspace = match Workspace::open(root) {
        Ok(ws) => ws,
        Err(e) => return report(&e),
    };

    match command.as_str() {
        "add" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.add(&ops[0]).map(|_| ()))
        }),
        "commit" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.commit(&ops[0]).map(|_| ()))
        }),
        "rm" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.rm(&ops[0]))
        }),
        "branch" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.branch(BranchName::new(ops[0].as_str())?))
        }),
        "rm-branch" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.delete_branch(&BranchName::new(ops[0].as_str())?))
        }),
        "reset" => mutating(&workspace, operands, 1, |ws, ops| {
            ws.with_repo_mut(|repo| repo.reset(&ops[0]))
        }),
        "checkout" => checkout(&workspace, operands),
        "merge" => merge(&workspace, operands),
        "log" => reading(operands, 0, || {
            workspace.with_repo(|repo| {
                for commit in repo.log()? {
                    print_log_entry(commit);
                }
                Ok(())
            })
        }),
        "global-log" => reading(operands, 0, || {
            workspace.with_repo(|repo| {
                for commit in repo.global_log() {
                    print_log_entry(commit);
                }
                Ok(())
            })
        }),
        "find" => reading(operands, 1, || {
            workspace.with_repo(|repo| {
                for id in repo.find(&operands[0])? {
                    println!("{}", id);
                }
                Ok(())
            })
        }),
        "status" => reading(operands, 0, || {
            workspace.with_repo(|repo| {
                println!("{}", repo.status());
                Ok(())
            })
        }),
        _ => {
            println!("No command with that name exists.");
            ExitCode::SUCCESS
        }
    }
}

/// run a mutating command: validate operand count, execute, checkpoint
fn mutating<F>(workspace: &Workspace, operands: &[String], expected: usize, f: F) -> ExitCode
where
    F: FnOnce(&Workspace, &[String]) -> StorageResult<()>,
{
    if operands.len() != expected {
        println!("Incorrect operands.");
        return ExitCode::SUCCESS;
    }
    let code = match f(workspace, operands) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    };
    workspace.checkpoint();
    code
}

/// run a read-only command: validate operand count, execute
fn reading<F>(operands: &[String], expected: usize, f: F) -> ExitCode
where
    F: FnOnce() -> StorageResult<()>,
{
    if operands.len() != expected {
        println!("Incorrect operands.");
        return ExitCode::SUCCESS;
    }
    match f() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// the three checkout forms:
/// `checkout -- <file>`, `checkout <id> -- <file>`, `checkout <branch>`
fn checkout(workspace: &Workspace, operands: &[String]) -> ExitCode {
    let result = match operands {
        [dashes, file] if dashes == "--" => {
            workspace.with_repo_mut(|repo| repo.checkout_file(file))
        }
        [id, dashes, file] if dashes == "--" => {
            workspace.with_repo_mut(|repo| repo.checkout_file_at(id, file))
        }
        [branch] => workspace.with_repo_mut(|repo| {
            repo.checkout_branch(&BranchName::new(branch.as_str())?)
        }),
        _ => {
            println!("Incorrect operands.");
            return ExitCode::SUCCESS;
        }
    };
    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    };
    workspace.checkpoint();
    code
}

fn merge(workspace: &Workspace, operands: &[String]) -> ExitCode {
    if operands.len() != 1 {
        println!("Incorrect operands.");
        return ExitCode::SUCCESS;
    }
    let result = workspace
        .with_repo_mut(|repo| repo.merge(&BranchName::new(operands[0].as_str())?));
    let code = match result {
        Ok(MergeOutcome::Merged(_)) => ExitCode::SUCCESS,
        Ok(MergeOutcome::FastForwarded(_)) => {
            println!("Current branch fast-forwarded.");
            ExitCode::SUCCESS
        }
        Ok(MergeOutcome::Conflicts(_)) => {
            println!("Encountered a merge conflict.");
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    };
    workspace.checkpoint();
    code
}

fn print_log_entry(commit: &crate::storage::Commit) {
    println!("===");
    println!("Commit {}", commit.id);
    println!("{}", commit.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("{}\n", commit.message);
}

/// report a failure the way the original tool did: domain errors go to
/// stdout and the process exits normally, hard failures go to stderr
fn report(err: &StorageError) -> ExitCode {
    if err.is_fatal() {
        eprintln!("Error: {}", err);
        ExitCode::FAILURE
    } else {
        println!("{}", err);
        ExitCode::SUCCESS
    }
}
