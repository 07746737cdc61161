//! Print an admin bearer token signed with `AUTH_TOKEN_SECRET`.
//!
//! Usage: `mint-token [ttl-hours]` (default 12).

use cakewalk_shared::{auth, Config};
use chrono::Duration;

const DEFAULT_TTL_HOURS: i64 = 12;

fn parse_ttl(arg: Option<String>) -> Result<Duration, Box<dyn std::error::Error>> {
    let hours = match arg {
        Some(raw) => raw.trim().parse::<i64>()?,
        None => DEFAULT_TTL_HOURS,
    };
    if hours <= 0 {
        return Err("ttl-hours must be positive".into());
    }
    Ok(Duration::try_hours(hours).ok_or("ttl-hours out of range")?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let ttl = parse_ttl(std::env::args().nth(1))?;

    let token = auth::issue_token(&config.auth_secret, ttl, chrono::Utc::now())?;
    println!("{token}");
    Ok(())
}
