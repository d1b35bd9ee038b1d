use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_host() -> IpAddr {
    env::var("WORLD_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub fn http_port() -> u16 {
    env::var("WORLD_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn ai_tick_interval() -> Duration {
    Duration::from_millis(env_u64("AI_TICK_MS").unwrap_or(100))
}

pub fn rock_spawn_interval() -> Duration {
    Duration::from_secs(env_u64("ROCK_SPAWN_SECS").unwrap_or(30))
}

pub fn enemy_spawn_interval() -> Duration {
    Duration::from_secs(env_u64("ENEMY_SPAWN_SECS").unwrap_or(20))
}

// Zero would make tokio intervals panic, so it counts as unset.
fn env_u64(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
