use apart_app::platform::ui::input::{parse_line, Input, InputError};
use apart_app::platform::ui::render;
use apart_core::{update, AppState, HistoryKey, Message, Msg, Partition, Value};
use chrono::{TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;

type DateTimeUtc = chrono::DateTime<Utc>;

#[test]
fn clone_defaults_name_to_partition() {
    assert_eq!(
        parse_line("clone sda1 /mnt/backup").unwrap(),
        Input::Msg(Msg::StartClone {
            source: "/dev/sda1".to_owned(),
            directory: "/mnt/backup".to_owned(),
            name: "sda1".to_owned(),
            compression: None,
        })
    );
    assert_eq!(
        parse_line("  clone /dev/sdb2 /mnt/b home zst ").unwrap(),
        Input::Msg(Msg::StartClone {
            source: "/dev/sdb2".to_owned(),
            directory: "/mnt/b".to_owned(),
            name: "home".to_owned(),
            compression: Some("zst".to_owned()),
        })
    );
}

#[test]
fn job_commands_take_one_id() {
    assert_eq!(
        parse_line("cancel 4").unwrap(),
        Input::Msg(Msg::CancelClicked {
            job_id: "4".to_owned()
        })
    );
    assert_eq!(
        parse_line("restore /mnt/b/x.apt.ext4.gz sdb1").unwrap(),
        Input::Msg(Msg::StartRestore {
            image: "/mnt/b/x.apt.ext4.gz".to_owned(),
            device: "/dev/sdb1".to_owned(),
        })
    );
    assert!(matches!(parse_line("forget"), Err(InputError::Usage(_))));
    assert!(matches!(parse_line("cancel"), Err(InputError::Usage(_))));
    assert!(matches!(parse_line("clone sda1"), Err(InputError::Usage(_))));
}

#[test]
fn misc_commands() {
    assert_eq!(parse_line("").unwrap(), Input::Empty);
    assert_eq!(parse_line("help").unwrap(), Input::Help);
    assert_eq!(parse_line("refresh").unwrap(), Input::Msg(Msg::RefreshSources));
    assert_eq!(parse_line("quit").unwrap(), Input::Msg(Msg::QuitRequested));
    assert_eq!(
        parse_line("format sda1"),
        Err(InputError::Unknown("format".to_owned()))
    );
}

#[test]
fn sizes_use_binary_units() {
    assert_eq!(render::format_size(512), "512 B");
    assert_eq!(render::format_size(1536), "1.5 KiB");
    assert_eq!(render::format_size(20 * 1024 * 1024 * 1024), "20.0 GiB");
}

#[test]
fn partition_line_shows_label_and_mount() {
    let part = Partition {
        name: "sda1".to_owned(),
        size: 2 * 1024 * 1024 * 1024,
        fstype: Some("ntfs".to_owned()),
        label: Some("Windows System".to_owned()),
        mounted: true,
    };
    let line = render::partition_line(&part);
    assert!(line.starts_with("sda1 Windows..."));
    assert!(line.contains("2.0 GiB"));
    assert!(line.ends_with("ntfs  (mounted)"));
}

#[test]
fn history_commands_take_a_record_key() {
    let key: HistoryKey = "3".parse().unwrap();
    assert_eq!(
        parse_line("rerun #3").unwrap(),
        Input::Msg(Msg::RerunClicked { key })
    );
    assert_eq!(
        parse_line("forget 3").unwrap(),
        Input::Msg(Msg::ForgetClicked { key })
    );
    assert_eq!(
        parse_line("delete #3").unwrap(),
        Input::Msg(Msg::DeleteImageClicked { key })
    );
    assert!(matches!(parse_line("rerun job-a"), Err(InputError::Usage(_))));
    assert!(matches!(parse_line("delete #"), Err(InputError::Usage(_))));
}

#[test]
fn renders_running_and_finished_jobs() {
    let start = Utc.with_ymd_and_hms(2017, 5, 3, 10, 0, 0).unwrap();
    let progress = |complete: f64, finish: Option<DateTimeUtc>| {
        let mut builder = Message::build("clone")
            .field("id", "7")
            .field("source", "/dev/sda1")
            .field("destination", "/mnt/b/root-2017-05-03T1000.apt.ext4.gz")
            .field("start", start)
            .field("rate", "50 MB/s")
            .field("complete", complete);
        if let Some(finish) = finish {
            builder = builder.field("finish", finish);
        }
        builder.finish()
    };

    let (state, _) = update(AppState::new(), Msg::Worker(progress(0.5, None)));
    let mut out = Vec::new();
    render::render(&mut out, &state.view_at(start + TimeDelta::seconds(90))).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("== apart (waiting for apart-core) =="));
    assert!(text.contains("[7] clone sda1 -> /mnt/b  [##########          ]  50%  0:01:30  50 MB/s"));

    let (state, _) = update(state, Msg::Worker(progress(1.0, Some(start + TimeDelta::seconds(120)))));
    let view = state.view_at(start + TimeDelta::seconds(125));
    let mut out = Vec::new();
    render::render(&mut out, &view).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("Running:"));
    assert!(text.contains(
        "[#1] ok   sda1 -> /mnt/b  just now  took 0:02:00  root-2017-05-03T1000.apt.ext4.gz"
    ));
}

#[test]
fn failure_prompt_has_title_and_detail() {
    let mut out = Vec::new();
    render::report_failure(&mut out, "Clone failed", "sda1 -> /mnt/b: read error").unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "!! Clone failed\n!! sda1 -> /mnt/b: read error\n"
    );
}

#[test]
fn partitions_come_from_started_status() {
    let part = |name: &str| {
        let mut map = std::collections::BTreeMap::new();
        map.insert("name".to_owned(), Value::from(name));
        map.insert("size".to_owned(), Value::from(4_i64 * 1024 * 1024 * 1024));
        Value::Map(map)
    };
    let mut source = std::collections::BTreeMap::new();
    source.insert("name".to_owned(), Value::from("sda"));
    source.insert("parts".to_owned(), Value::Seq(vec![part("sda1"), part("sda2")]));
    let started = Message::build("status")
        .field("status", "started")
        .field("sources", Value::Seq(vec![Value::Map(source)]))
        .finish();

    let (state, _) = update(AppState::new(), Msg::Worker(started));
    let mut out = Vec::new();
    render::render(&mut out, &state.view()).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("== apart (ready) =="));
    assert!(text.contains("  sda1 "));
    assert!(text.contains("  sda2 "));
}
