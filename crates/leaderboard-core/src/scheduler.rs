//! Cron-driven pipeline triggers, one job per enabled group.
//!
//! The registry is owned here and guarded by a single lock. `upsert`
//! replaces a job by group id atomically, so a reconfigured group can never
//! end up with two live jobs. The loop sleeps until the earliest due job,
//! a registry change, a periodic resync, or shutdown, whichever is first.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{LeaderboardError, Result};
use crate::model::TrackedGroup;
use crate::pipeline::Pipeline;
use crate::store::Store;

/// Parse a cron expression.
///
/// Five-field expressions are standard crontab: an implied seconds field of
/// `0` is added and the day-of-week field is read with Sunday as `0` (or
/// `7`). Six- and seven-field expressions are handed to the `cron` crate as
/// is, where Sunday is `1`.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let expr = expr.trim();
    let invalid = |reason: String| LeaderboardError::InvalidCron {
        expr: expr.to_string(),
        reason,
    };
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let full = match fields.as_slice() {
        [minute, hour, day, month, weekday] => {
            let weekday = standard_day_of_week(weekday).map_err(invalid)?;
            format!("0 {minute} {hour} {day} {month} {weekday}")
        }
        _ => expr.to_string(),
    };
    Schedule::from_str(&full).map_err(|e| invalid(e.to_string()))
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Rewrite a crontab day-of-week field as day names, which both numberings
/// agree on. `*` and `*/n` already select the same days under either
/// numbering and are kept.
fn standard_day_of_week(field: &str) -> std::result::Result<String, String> {
    let mut days: Vec<&str> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();

    for part in field.split(',') {
        let (base, step) = match part.split_once('/') {
            Some((base, step)) => match step.parse::<usize>() {
                Ok(step) if step > 0 => (base, Some(step)),
                _ => return Err(format!("invalid step in day-of-week '{part}'")),
            },
            None => (part, None),
        };
        if base == "*" || base == "?" {
            kept.push(part);
            continue;
        }
        let (first, last) = match base.split_once('-') {
            Some((a, b)) => (day_number(a)?, day_number(b)?),
            None if step.is_some() => (day_number(base)?, 6),
            None => {
                let day = day_number(base)?;
                (day, day)
            }
        };
        if first > last {
            return Err(format!("day-of-week range '{base}' runs backwards"));
        }
        for day in (first..=last).step_by(step.unwrap_or(1)) {
            let name = WEEKDAYS[day % 7];
            if !days.contains(&name) {
                days.push(name);
            }
        }
    }

    kept.extend(days);
    Ok(kept.join(","))
}

/// `0`..=`7` (both ends Sunday) or a three-letter day name.
fn day_number(token: &str) -> std::result::Result<usize, String> {
    if let Ok(n) = token.parse::<usize>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(format!("day-of-week {n} is out of range 0-7"))
        };
    }
    WEEKDAYS
        .iter()
        .position(|d| d.eq_ignore_ascii_case(token))
        .ok_or_else(|| format!("unknown day of week '{token}'"))
}

/// Next fire time strictly after `after`, evaluated in `tz`.
pub fn next_after(schedule: &Schedule, tz: &Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobChange {
    Added,
    Replaced,
    Unchanged,
    Removed,
    /// Disabled group with no job to remove.
    Ignored,
}

struct Job {
    expression: String,
    schedule: Schedule,
    next_fire: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Store>,
    tz: Tz,
    resync_every: Duration,
    jobs: Mutex<HashMap<String, Job>>,
    changed: Notify,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<dyn Store>, tz: Tz, resync_every: Duration) -> Self {
        Self {
            pipeline,
            store,
            tz,
            resync_every,
            jobs: Mutex::new(HashMap::new()),
            changed: Notify::new(),
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add, replace or remove the job for `group`. A malformed cron leaves
    /// the registry untouched.
    pub fn upsert(&self, group: &TrackedGroup) -> Result<JobChange> {
        self.upsert_at(group, Utc::now())
    }

    fn upsert_at(&self, group: &TrackedGroup, now: DateTime<Utc>) -> Result<JobChange> {
        if !group.enabled {
            return Ok(if self.remove(&group.id) {
                JobChange::Removed
            } else {
                JobChange::Ignored
            });
        }
        let schedule = parse_schedule(&group.schedule)?;

        let change = {
            let mut jobs = self.jobs();
            let change = match jobs.get(&group.id) {
                Some(job) if job.expression == group.schedule => JobChange::Unchanged,
                Some(_) => JobChange::Replaced,
                None => JobChange::Added,
            };
            if change != JobChange::Unchanged {
                let next_fire = next_after(&schedule, &self.tz, now);
                jobs.insert(
                    group.id.clone(),
                    Job {
                        expression: group.schedule.clone(),
                        schedule,
                        next_fire,
                    },
                );
            }
            change
        };
        if change != JobChange::Unchanged {
            tracing::info!(
                group_id = %group.id,
                schedule = %group.schedule,
                change = ?change,
                "leaderboard job registered"
            );
            self.changed.notify_one();
        }
        Ok(change)
    }

    /// Drop the job for `group_id` and cancel any run it has in flight.
    pub fn remove(&self, group_id: &str) -> bool {
        let removed = self.jobs().remove(group_id).is_some();
        if removed {
            self.pipeline.cancel(group_id);
            tracing::info!(%group_id, "leaderboard job removed");
            self.changed.notify_one();
        }
        removed
    }

    /// Align the registry with the store: every enabled group gets a job,
    /// everything else loses it. Groups with a bad cron are logged and
    /// skipped.
    pub fn sync(&self) -> Result<usize> {
        let groups = self.store.groups()?;
        for group in &groups {
            if let Err(e) = self.upsert(group) {
                tracing::warn!(group_id = %group.id, "not scheduling group: {e}");
            }
        }
        let stale: Vec<String> = self
            .jobs()
            .keys()
            .filter(|id| !groups.iter().any(|g| &g.id == *id && g.enabled))
            .cloned()
            .collect();
        for id in stale {
            self.remove(&id);
        }
        Ok(self.jobs().len())
    }

    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn next_fire(&self, group_id: &str) -> Option<DateTime<Utc>> {
        self.jobs().get(group_id).and_then(|j| j.next_fire)
    }

    fn earliest(&self) -> Option<DateTime<Utc>> {
        self.jobs().values().filter_map(|j| j.next_fire).min()
    }

    /// Jobs due at `now`, each advanced to its following fire time.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut due = Vec::new();
        for (id, job) in self.jobs().iter_mut() {
            if job.next_fire.is_some_and(|t| t <= now) {
                job.next_fire = next_after(&job.schedule, &self.tz, now);
                due.push(id.clone());
            }
        }
        due.sort();
        due
    }

    fn dispatch(&self, group_id: String) {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            tracing::info!(%group_id, "leaderboard job due, triggering run");
            match pipeline.run(&group_id).await {
                Ok(report) => tracing::debug!(
                    %group_id,
                    run_id = %report.run_id,
                    published = report.published(),
                    "scheduled run completed"
                ),
                Err(LeaderboardError::RunInProgress(_)) => {
                    tracing::warn!(%group_id, "previous run still in flight; skipping")
                }
                Err(e) => tracing::error!(%group_id, "scheduled run failed: {e}"),
            }
        });
    }

    /// Run the scheduling loop until `shutdown` fires. Shutdown also
    /// cancels in-flight runs.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(jobs = self.jobs().len(), tz = %self.tz, "scheduler started");
            let mut next_resync = tokio::time::Instant::now() + self.resync_every;

            loop {
                let now = Utc::now();
                for group_id in self.take_due(now) {
                    self.dispatch(group_id);
                }

                let until_due = self
                    .earliest()
                    .map(|t| (t - now).to_std().unwrap_or(Duration::ZERO))
                    .unwrap_or(self.resync_every);
                let wake = tokio::time::Instant::now() + until_due;

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.changed.notified() => {}
                    _ = tokio::time::sleep_until(wake.min(next_resync)) => {}
                }

                if tokio::time::Instant::now() >= next_resync {
                    if let Err(e) = self.sync() {
                        tracing::warn!("scheduler resync failed: {e}");
                    }
                    next_resync = tokio::time::Instant::now() + self.resync_every;
                }
            }

            self.pipeline.shutdown();
            tracing::info!("scheduler stopped");
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiSet;
    use crate::pipeline::PipelineOptions;
    use crate::store::RedbStore;
    use crate::testing::{self, FakeChat, FakeProvider};
    use chrono::{Datelike, TimeZone, Timelike, Weekday};
    use tempfile::TempDir;

    fn scheduler() -> (TempDir, Arc<RedbStore>, Scheduler) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RedbStore::open(&dir.path().join("sched.redb")).unwrap());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            Arc::new(FakeProvider::new()),
            Arc::new(FakeChat::new()),
            Arc::new(testing::catalog()),
            Arc::new(EmojiSet::new()),
            PipelineOptions::default(),
        ));
        let sched = Scheduler::new(
            pipeline,
            store.clone(),
            chrono_tz::America::Chicago,
            Duration::from_secs(60),
        );
        (dir, store, sched)
    }

    fn group(id: &str, schedule: &str, enabled: bool) -> TrackedGroup {
        TrackedGroup {
            id: id.into(),
            name: id.into(),
            channel_id: "c1".into(),
            schedule: schedule.into(),
            activities: vec!["Woodcutting".into()],
            edit_in_place: true,
            enabled,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn five_field_expressions_get_seconds() {
        assert!(parse_schedule("0 19 * * SUN").is_ok());
        assert!(parse_schedule("0 0 19 * * SUN").is_ok());
        let err = parse_schedule("every sunday").unwrap_err();
        assert!(err.to_string().contains("invalid cron expression"));
    }

    /// Local weekdays of the next `n` fires after Monday 2024-01-15 06:00 CST.
    fn weekdays(expr: &str, n: usize) -> Vec<Weekday> {
        let schedule = parse_schedule(expr).unwrap();
        let tz = chrono_tz::America::Chicago;
        let mut at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut out = Vec::new();
        for _ in 0..n {
            at = next_after(&schedule, &tz, at).unwrap();
            let local = at.with_timezone(&tz);
            assert_eq!(local.hour(), 19);
            out.push(local.weekday());
        }
        out
    }

    #[test]
    fn five_field_day_of_week_counts_sunday_as_zero() {
        use Weekday::*;
        assert_eq!(weekdays("0 19 * * 0", 2), vec![Sun, Sun]);
        assert_eq!(weekdays("0 19 * * 7", 1), vec![Sun]);
        assert_eq!(weekdays("0 19 * * 1", 1), vec![Mon]);
        assert_eq!(
            weekdays("0 19 * * 1-5", 7),
            vec![Mon, Tue, Wed, Thu, Fri, Mon, Tue]
        );
        assert_eq!(weekdays("0 19 * * 5-7", 3), vec![Fri, Sat, Sun]);
        assert_eq!(weekdays("0 19 * * 0,3", 3), vec![Wed, Sun, Wed]);
        assert_eq!(weekdays("0 19 * * 1-5/2", 3), vec![Mon, Wed, Fri]);
        assert_eq!(weekdays("0 19 * * sun", 1), vec![Sun]);
        assert_eq!(weekdays("0 19 * * MON-FRI", 5), vec![Mon, Tue, Wed, Thu, Fri]);
        assert_eq!(weekdays("0 19 * * */3", 3), vec![Wed, Sat, Sun]);
    }

    #[test]
    fn bad_day_of_week_is_rejected() {
        for expr in ["0 19 * * 8", "0 19 * * 5-2", "0 19 * * FUNDAY", "0 19 * * 1/0"] {
            let err = parse_schedule(expr).unwrap_err();
            assert!(
                matches!(err, LeaderboardError::InvalidCron { .. }),
                "{expr}: {err}"
            );
        }
    }

    #[test]
    fn schedule_is_evaluated_in_reference_zone() {
        let schedule = parse_schedule("0 19 * * *").unwrap();
        // 2024-01-15 12:00 UTC is 06:00 in Chicago (CST, UTC-6).
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let next = next_after(&schedule, &chrono_tz::America::Chicago, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 16, 1, 0, 0).unwrap());
    }

    #[test]
    fn upsert_replaces_by_key() {
        let (_dir, _store, sched) = scheduler();
        let g = group("g1", "0 19 * * SUN", true);
        assert_eq!(sched.upsert(&g).unwrap(), JobChange::Added);
        assert_eq!(sched.upsert(&g).unwrap(), JobChange::Unchanged);

        let changed = group("g1", "0 20 * * SUN", true);
        assert_eq!(sched.upsert(&changed).unwrap(), JobChange::Replaced);
        assert_eq!(sched.job_ids(), vec!["g1"]);

        assert_eq!(
            sched.upsert(&group("g1", "0 20 * * SUN", false)).unwrap(),
            JobChange::Removed
        );
        assert!(sched.job_ids().is_empty());
        assert_eq!(
            sched.upsert(&group("g1", "0 20 * * SUN", false)).unwrap(),
            JobChange::Ignored
        );
    }

    #[test]
    fn malformed_cron_keeps_existing_job() {
        let (_dir, _store, sched) = scheduler();
        sched.upsert(&group("g1", "0 19 * * SUN", true)).unwrap();
        let before = sched.next_fire("g1");
        assert!(sched.upsert(&group("g1", "nonsense", true)).is_err());
        assert_eq!(sched.next_fire("g1"), before);
    }

    #[test]
    fn due_jobs_are_advanced() {
        let (_dir, _store, sched) = scheduler();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        sched
            .upsert_at(&group("g1", "0 */5 * * * *", true), start)
            .unwrap();
        sched
            .upsert_at(&group("g2", "0 0 19 * * *", true), start)
            .unwrap();

        let later = start + chrono::Duration::minutes(6);
        assert_eq!(sched.take_due(later), vec!["g1"]);
        assert!(sched.next_fire("g1").unwrap() > later);
        assert!(sched.take_due(later).is_empty());
    }

    #[test]
    fn sync_follows_the_store() {
        let (_dir, store, sched) = scheduler();
        store.put_group(&group("g1", "0 19 * * SUN", true)).unwrap();
        store.put_group(&group("g2", "0 19 * * SUN", false)).unwrap();
        store.put_group(&group("g3", "bad cron", true)).unwrap();
        sched.upsert(&group("gone", "0 19 * * SUN", true)).unwrap();

        assert_eq!(sched.sync().unwrap(), 1);
        assert_eq!(sched.job_ids(), vec!["g1"]);
    }

    #[test]
    fn resync_sees_groups_written_by_another_handle() {
        let (_dir, store, sched) = scheduler();
        assert_eq!(sched.sync().unwrap(), 0);

        let other = RedbStore::open(store.path()).unwrap();
        other.put_group(&group("g1", "0 19 * * SUN", true)).unwrap();
        assert_eq!(sched.sync().unwrap(), 1);
        assert_eq!(sched.job_ids(), vec!["g1"]);

        other.put_group(&group("g1", "0 19 * * SUN", false)).unwrap();
        assert_eq!(sched.sync().unwrap(), 0);
    }

    #[tokio::test]
    async fn loop_stops_on_shutdown() {
        let (_dir, _store, sched) = scheduler();
        let shutdown = CancellationToken::new();
        let handle = Arc::new(sched).start(shutdown.clone());
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
