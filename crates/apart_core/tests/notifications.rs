use apart_core::{Digest, FinishedJob, Message, NotificationAggregator};
use chrono::{TimeZone, Utc};

fn finished(id: &str, error: Option<&str>) -> FinishedJob {
    let start = Utc.with_ymd_and_hms(2017, 5, 3, 10, 0, 0).unwrap();
    let builder = match error {
        Some(error) => Message::build("clone-failed").field("error", error),
        None => Message::build("clone").field("complete", 1.0),
    };
    FinishedJob::from_message(
        builder
            .field("id", id)
            .field("source", "/dev/sda1")
            .field("destination", "/tmp/x-2017-05-03T1000.apt.ext4.gz")
            .field("start", start)
            .field("finish", start)
            .finish(),
    )
    .unwrap()
}

#[test]
fn digest_text_pluralizes_and_lists_failures_first() {
    let digest = |successes, failures| Digest { successes, failures }.to_string();
    assert_eq!(digest(1, 0), "1 job finished");
    assert_eq!(digest(3, 0), "3 jobs finished");
    assert_eq!(digest(0, 1), "1 job failed");
    assert_eq!(digest(2, 2), "2 jobs failed, 2 jobs finished");
    assert_eq!(digest(1, 1), "1 job failed, 1 job finished");
}

#[test]
fn digest_waits_until_nothing_is_running() {
    let mut aggregator = NotificationAggregator::new();
    assert_eq!(aggregator.on_job_finished(&finished("1", None), 1), None);
    assert_eq!(aggregator.on_job_finished(&finished("2", Some("io error")), 1), None);
    assert_eq!(aggregator.pending(), (1, 1));

    assert_eq!(
        aggregator.on_job_finished(&finished("3", None), 0),
        Some(Digest {
            successes: 2,
            failures: 1
        })
    );
    assert_eq!(aggregator.pending(), (0, 0));
}

#[test]
fn cancelled_jobs_are_not_counted() {
    let mut aggregator = NotificationAggregator::new();
    assert_eq!(aggregator.on_job_finished(&finished("1", Some("Cancelled")), 0), None);
    assert_eq!(aggregator.pending(), (0, 0));
}

#[test]
fn disabled_aggregator_never_emits() {
    let mut aggregator = NotificationAggregator::new();
    aggregator.disable();
    aggregator.disable();
    assert!(!aggregator.is_enabled());
    assert_eq!(aggregator.on_job_finished(&finished("1", None), 0), None);
    assert_eq!(aggregator.pending(), (0, 0));
}
