//! Duration rounding and human-readable time text.

use chrono::TimeDelta;

/// Rounds to whole seconds, half up: 0.5s -> 1s, 0.499999s -> 0s.
pub fn round_to_second(delta: TimeDelta) -> TimeDelta {
    let mut secs = delta.num_seconds();
    let mut nanos = i64::from(delta.subsec_nanos());
    if nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    if nanos >= 500_000_000 {
        secs += 1;
    }
    TimeDelta::seconds(secs)
}

/// `H:MM:SS`, prefixed by days when needed: `1 day, 2:03:04`.
pub fn format_clock(delta: TimeDelta) -> String {
    let total = delta.num_seconds();
    let (sign, total) = if total < 0 { ("-", -total) } else { ("", total) };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    match days {
        0 => format!("{sign}{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("{sign}1 day, {hours}:{minutes:02}:{seconds:02}"),
        n => format!("{sign}{n} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}

/// Natural-language span such as `a minute` or `3 hours`.
pub fn natural_delta(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().abs();
    let days = secs / 86_400;
    match secs {
        0 => "a moment".to_owned(),
        1 => "a second".to_owned(),
        2..=59 => format!("{secs} seconds"),
        60..=119 => "a minute".to_owned(),
        120..=3599 => format!("{} minutes", secs / 60),
        3600..=7199 => "an hour".to_owned(),
        7200..=86_399 => format!("{} hours", secs / 3600),
        _ if days == 1 => "a day".to_owned(),
        _ if days < 365 => format!("{days} days"),
        _ if days < 730 => "a year".to_owned(),
        _ => format!("{} years", days / 365),
    }
}

/// `natural_delta` for a point in the past.
pub fn natural_time(ago: TimeDelta) -> String {
    format!("{} ago", natural_delta(ago))
}
