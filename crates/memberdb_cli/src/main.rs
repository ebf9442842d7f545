//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise the member store end to end the way an outer caller would:
//!   seed members, look one up by id, print a page of DTOs as JSON.
//!
//! Usage: `memberdb_cli [DB_PATH]` (in-memory when omitted). Logs go to
//! `$MEMBERDB_LOG_DIR` when it is set to an absolute path.

use log::info;
use memberdb_core::{
    core_version, default_log_level, init_logging, open_db, open_db_in_memory, Auditor,
    Direction, MemberService, PageRequest, Session, Sort, SortProperty, SqliteMemberRepository,
};
use std::error::Error;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "MEMBERDB_LOG_DIR";
const SEED_USERNAMES: [&str; 2] = ["member1", "member2"];

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("memberdb_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        init_logging(default_log_level(), log_dir)?;
    }

    let mut conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    println!("memberdb_core version={}", core_version());

    let session = Session::begin(&mut conn, Auditor::named("memberdb_cli"))?;
    {
        let service = MemberService::new(SqliteMemberRepository::new(&session));
        let mut first_id = None;
        for username in SEED_USERNAMES {
            let member = service.register(username, 0, None)?;
            first_id = first_id.or(member.id);
        }
        let first_id = first_id.ok_or("seeding produced no member id")?;
        println!(
            "member id={} username={}",
            first_id,
            service.username_of(first_id)?
        );

        let request =
            PageRequest::of(0, 20).with_sort(Sort::by(SortProperty::Username, Direction::Asc));
        let page = service.list(&request)?;
        println!("{}", serde_json::to_string_pretty(&page)?);
    }
    session.commit()?;
    info!(
        "event=cli_done module=cli status=ok seeded={}",
        SEED_USERNAMES.len()
    );
    Ok(())
}
