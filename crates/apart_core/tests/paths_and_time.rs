use apart_core::paths::{
    extract_compression_option, extract_directory, extract_filename, extract_name, file_name,
    rm_dev,
};
use apart_core::timefmt::{format_clock, natural_delta, round_to_second};
use chrono::TimeDelta;

const IMAGE: &str = "/mnt/backups/work-2017-05-03T1020.apt.dd.gz";

#[test]
fn image_paths_split_into_parts() {
    assert_eq!(extract_directory(IMAGE), "/mnt/backups");
    assert_eq!(extract_filename(IMAGE), Some("work-2017-05-03T1020.apt.dd.gz"));
    assert_eq!(extract_name(IMAGE), Some("work"));
    assert_eq!(extract_compression_option(IMAGE), Some("gz"));
    assert_eq!(file_name(IMAGE), "work-2017-05-03T1020.apt.dd.gz");
}

#[test]
fn legacy_zstd_extension_reports_zst() {
    assert_eq!(
        extract_compression_option("/mnt/123/main-2017-05-03T1020.apt.dd.zstd"),
        Some("zst")
    );
}

#[test]
fn unrecognised_image_names_yield_none() {
    assert_eq!(extract_name("/tmp/random.img"), None);
    assert_eq!(extract_filename("no-slash-2017-05-03T1020.apt.dd.gz"), None);
}

#[test]
fn rm_dev_strips_only_the_dev_prefix() {
    assert_eq!(rm_dev("/dev/sda1"), "sda1");
    assert_eq!(rm_dev("/mnt/dev/sda1"), "/mnt/dev/sda1");
}

#[test]
fn round_to_second_rounds_half_up() {
    assert_eq!(round_to_second(TimeDelta::milliseconds(500)), TimeDelta::seconds(1));
    assert_eq!(round_to_second(TimeDelta::microseconds(499_999)), TimeDelta::zero());
    assert_eq!(
        round_to_second(TimeDelta::seconds(61) + TimeDelta::milliseconds(700)),
        TimeDelta::seconds(62)
    );
    assert_eq!(round_to_second(TimeDelta::milliseconds(-300)), TimeDelta::zero());
}

#[test]
fn clock_format_matches_elapsed_display() {
    assert_eq!(format_clock(TimeDelta::seconds(65)), "0:01:05");
    assert_eq!(format_clock(TimeDelta::seconds(3 * 3600 + 7)), "3:00:07");
    assert_eq!(
        format_clock(TimeDelta::seconds(86_400 + 3600 + 120 + 3)),
        "1 day, 1:02:03"
    );
}

#[test]
fn natural_delta_uses_coarse_units() {
    assert_eq!(natural_delta(TimeDelta::seconds(30)), "30 seconds");
    assert_eq!(natural_delta(TimeDelta::seconds(90)), "a minute");
    assert_eq!(natural_delta(TimeDelta::minutes(45)), "45 minutes");
    assert_eq!(natural_delta(TimeDelta::hours(5)), "5 hours");
    assert_eq!(natural_delta(TimeDelta::days(3)), "3 days");
}
