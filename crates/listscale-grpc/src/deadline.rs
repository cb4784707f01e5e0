//! Caller deadlines from the `grpc-timeout` request header.
//!
//! The header value is at most eight ASCII digits followed by a unit:
//! `H` hours, `M` minutes, `S` seconds, `m` milliseconds, `u`
//! microseconds, `n` nanoseconds.

use std::time::Duration;

use tonic::Request;

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// The caller's remaining time budget, if it sent one.
///
/// A malformed header is treated as absent.
pub fn grpc_timeout<T>(request: &Request<T>) -> Option<Duration> {
    let value = request.metadata().get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(value);
    if timeout.is_none() {
        tracing::debug!(%value, "ignoring malformed grpc-timeout header");
    }
    timeout
}

fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}
