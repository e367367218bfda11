//! Device and image-path helpers.
//!
//! Image files written by the worker are named
//! `<dir>/<name>-YYYY-MM-DDTHHMM.apt.<fs>.<compression>`.

use std::sync::LazyLock;

use regex::Regex;

static IMAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/(([^/]+)-\d{4,}-\d\d-\d\dT\d{4}\.apt\..+\.(.+))$").expect("image name regex")
});

/// `/dev/sda1` -> `sda1`
pub fn rm_dev(source: &str) -> &str {
    source.strip_prefix("/dev/").unwrap_or(source)
}

/// Drops the last path component: `/mnt/backups/work.apt.dd.gz` -> `/mnt/backups`.
pub fn extract_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) if idx + 1 < path.len() => &path[..idx],
        _ => path,
    }
}

/// Last path component, whatever its shape.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// `/mnt/backups/work-2017-05-03T1020.apt.dd.gz` -> `work-2017-05-03T1020.apt.dd.gz`
pub fn extract_filename(path: &str) -> Option<&str> {
    IMAGE_NAME_RE
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `/mnt/backups/work-2017-05-03T1020.apt.dd.gz` -> `work`
pub fn extract_name(path: &str) -> Option<&str> {
    IMAGE_NAME_RE
        .captures(path)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// `/mnt/backups/work-2017-05-03T1020.apt.dd.gz` -> `gz`
///
/// Images written with the older `.zstd` extension report `zst`.
pub fn extract_compression_option(path: &str) -> Option<&str> {
    let option = IMAGE_NAME_RE.captures(path)?.get(3)?.as_str();
    Some(if option == "zstd" { "zst" } else { option })
}
