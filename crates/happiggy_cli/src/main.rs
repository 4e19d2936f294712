//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `happiggy_core` linkage and storage bootstrap outside the app.
//! - Print the current home summary for quick local sanity checks.

use happiggy_core::db::open_db;
use happiggy_core::{init_logging, CoreConfig, HomeService, SqliteBottleRepository, SystemClock};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("happiggy_core ping={}", happiggy_core::ping());
    println!("happiggy_core version={}", happiggy_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("happiggy_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, &log_dir.to_string_lossy()).map_err(|err| err.to_string())?;
    }

    let mut conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteBottleRepository::try_new(&mut conn).map_err(|err| err.to_string())?;
    let summary = HomeService::new(repo, SystemClock)
        .summary()
        .map_err(|err| err.to_string())?;

    println!("db_path={}", config.db_path.display());
    match &summary.bottle {
        Some(bottle) => {
            println!("bottle={} start={}", bottle.id, bottle.start_date);
            println!(
                "countdown={} notes={}",
                summary.countdown.as_deref().unwrap_or("-"),
                bottle.note_count()
            );
        }
        None => println!("bottle=none"),
    }
    Ok(())
}
