use anyhow::{anyhow, Result};
use std::time::Duration;

/// Parse a human duration argument like "500ms", "30s", or "5m".
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if let Some(millis) = input.strip_suffix("ms") {
        let millis: u64 = millis.parse()?;
        Ok(Duration::from_millis(millis))
    } else if let Some(mins) = input.strip_suffix('m') {
        let mins: u64 = mins.parse()?;
        Ok(Duration::from_secs(mins * 60))
    } else if let Some(secs) = input.strip_suffix('s') {
        let secs: u64 = secs.parse()?;
        Ok(Duration::from_secs(secs))
    } else {
        let secs: u64 = input
            .parse()
            .map_err(|_| anyhow!("Invalid duration: {}", input))?;
        Ok(Duration::from_secs(secs))
    }
}

/// Parse a comma-separated list of integers, e.g. "4,8,16".
pub fn parse_u64_list(input: &str) -> Result<Vec<u64>> {
    input
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("Invalid number in list: {}", part))
        })
        .collect()
}
