use std::time::Instant;

pub fn env_var_truthy(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let v = v.to_ascii_lowercase();
        v == "1" || v == "true" || v == "yes" || v == "on"
    })
}

pub fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<usize>().ok())
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
