//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `sentinel_core` linkage and store bootstrap without the Flutter
//!   runtime.
//! - Keep output deterministic for quick local sanity checks.

use sentinel_core::db::migrations::latest_version;
use sentinel_core::db::open_db_in_memory;
use sentinel_core::{CaseReader, SqliteCaseRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("sentinel_core ping={}", sentinel_core::ping());
    println!("sentinel_core version={}", sentinel_core::core_version());
    println!("sentinel_core schema_version={}", latest_version());

    let mut conn = match open_db_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("sentinel_core store=error {err}");
            return ExitCode::FAILURE;
        }
    };
    match SqliteCaseRepository::try_new(&mut conn).and_then(|repo| repo.list_cases()) {
        Ok(cases) => {
            println!("sentinel_core store=ok cases={}", cases.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sentinel_core store=error {err}");
            ExitCode::FAILURE
        }
    }
}
