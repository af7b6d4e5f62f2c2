use chrono::{Datelike, Duration, NaiveDate, Weekday};
use daylit_core::recurrence::LAST_OCCURRENCE;
use daylit_core::{
    ConflictKind, DayPlan, Recurrence, Slot, Task, auto_fix_duplicate_tasks, generate_plan, is_due,
    schedule_day, times_overlap, validate_plan, validate_tasks,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn every_day_of(year: i32) -> impl Iterator<Item = NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    first.iter_days().take_while(move |d| d.year() == year)
}

fn span(plan: &DayPlan, id: &str) -> Option<(String, String)> {
    plan.slots
        .iter()
        .find(|s| s.task_id == id)
        .map(|s| (s.start.clone(), s.end.clone()))
}

#[test]
fn weekly_appointments_on_disjoint_days_never_overlap() {
    let tasks = vec![
        Task::appointment("a", "Standup", "09:00", "10:00").with_recurrence(Recurrence::Weekly {
            weekdays: vec![Weekday::Mon, Weekday::Wed],
        }),
        Task::appointment("b", "Gym", "09:00", "10:00").with_recurrence(Recurrence::Weekly {
            weekdays: vec![Weekday::Tue, Weekday::Thu],
        }),
    ];

    let all_days = validate_tasks(&tasks, None);
    assert_eq!(all_days.of_kind(ConflictKind::OverlappingFixedTasks).count(), 0);

    for d in every_day_of(2026).take(14) {
        let on_day = validate_tasks(&tasks, Some(d));
        assert!(!on_day.has_conflicts(), "unexpected conflict on {d}");
    }
}

#[test]
fn weekly_appointments_sharing_a_day_do_overlap() {
    let tasks = vec![
        Task::appointment("a", "Standup", "09:00", "10:00").with_recurrence(Recurrence::Weekly {
            weekdays: vec![Weekday::Mon, Weekday::Wed],
        }),
        Task::appointment("b", "Gym", "09:30", "10:30").with_recurrence(Recurrence::Weekly {
            weekdays: vec![Weekday::Wed],
        }),
    ];
    let result = validate_tasks(&tasks, None);
    assert_eq!(result.of_kind(ConflictKind::OverlappingFixedTasks).count(), 1);

    // Monday only has the standup
    assert!(!validate_tasks(&tasks, Some(date("2026-01-05"))).has_conflicts());
}

#[test]
fn monthly_day_31_only_in_long_months() {
    let rule = Recurrence::MonthlyDate { month_day: 31 };

    assert!(rule.is_due(date("2026-01-31"), None));
    assert!(rule.is_due(date("2026-03-31"), None));
    assert!(!rule.is_due(date("2026-02-28"), None));
    assert!(!rule.is_due(date("2026-04-30"), None));

    let due: Vec<NaiveDate> = every_day_of(2026).filter(|d| rule.is_due(*d, None)).collect();
    assert_eq!(due.len(), 7);
    assert!(due.iter().all(|d| d.day() == 31));
}

#[test]
fn last_friday_is_a_friday_with_no_friday_after_it() {
    let task = Task::flexible("t", "Timesheet", 30).with_recurrence(Recurrence::MonthlyDay {
        weekday: Weekday::Fri,
        occurrence: LAST_OCCURRENCE,
    });

    assert!(is_due(&task, date("2026-01-30")));
    assert!(!is_due(&task, date("2026-01-23")));

    for d in every_day_of(2026) {
        let expected = d.weekday() == Weekday::Fri && (d + Duration::days(7)).month() != d.month();
        assert_eq!(is_due(&task, d), expected, "mismatch on {d}");
    }
}

#[test]
fn priority_then_lateness_decides_who_fits() {
    let tasks = vec![
        Task::flexible("recent", "Recent", 120)
            .with_priority(2)
            .with_last_done("2026-01-04"),
        Task::flexible("urgent", "Urgent", 120).with_priority(1),
        Task::flexible("overdue", "Overdue", 120)
            .with_priority(2)
            .with_last_done("2025-12-30"),
    ];

    let schedule = schedule_day("2026-01-05", &tasks, "09:00", "13:00").unwrap();
    let plan = &schedule.plan;

    assert_eq!(plan.slots.len(), 2);
    assert_eq!(plan.slots[0].task_id, "urgent");
    assert_eq!(span(plan, "urgent"), Some(("09:00".into(), "11:00".into())));
    assert_eq!(span(plan, "overdue"), Some(("11:00".into(), "13:00".into())));
    assert_eq!(schedule.unplaced, vec!["recent".to_string()]);
}

#[test]
fn lunch_stays_put_and_work_flows_around_it() {
    let tasks = vec![
        Task::appointment("lunch", "Lunch", "12:00", "13:00"),
        Task::flexible("write", "Write", 120),
        Task::flexible("review", "Review", 120),
    ];

    let plan = generate_plan("2026-01-05", &tasks, "09:00", "17:00").unwrap();

    assert_eq!(span(&plan, "lunch"), Some(("12:00".into(), "13:00".into())));
    assert_eq!(span(&plan, "write"), Some(("09:00".into(), "11:00".into())));
    assert_eq!(span(&plan, "review"), Some(("13:00".into(), "15:00".into())));

    let report = validate_plan(&plan, &tasks, "09:00", "17:00");
    assert!(!report.has_conflicts(), "{}", report.format_report());
}

#[test]
fn times_overlap_is_symmetric_and_half_open() {
    let ranges = [
        ("09:00", "10:00"),
        ("09:30", "10:30"),
        ("10:00", "11:00"),
        ("08:00", "12:00"),
        ("11:00", "11:30"),
    ];
    for (s1, e1) in ranges {
        for (s2, e2) in ranges {
            assert_eq!(times_overlap(s1, e1, s2, e2), times_overlap(s2, e2, s1, e1));
        }
        assert!(times_overlap(s1, e1, s1, e1), "{s1}-{e1} should overlap itself");
    }
    assert!(!times_overlap("09:00", "10:00", "10:00", "11:00"));
    assert!(!times_overlap("09:00", "10:00", "bad", "11:00"));
}

fn load_kinds(end: &str) -> Vec<ConflictKind> {
    let tasks = vec![Task::flexible("work", "Work", 60)];
    let plan = DayPlan::new("2026-01-05", vec![Slot::planned("09:00", end, "work")]);
    validate_plan(&plan, &tasks, "09:00", "19:00")
        .conflicts
        .into_iter()
        .map(|c| c.kind)
        .collect()
}

#[test]
fn load_thresholds_are_exclusive_of_each_other() {
    // 10h window
    assert!(load_kinds("16:54").is_empty());
    assert_eq!(load_kinds("17:00"), vec![ConflictKind::Overcommitted]);
    assert_eq!(load_kinds("19:00"), vec![ConflictKind::Overcommitted]);

    let tasks = vec![Task::flexible("a", "A", 60), Task::flexible("b", "B", 60)];
    let plan = DayPlan::new(
        "2026-01-05",
        vec![
            Slot::planned("09:00", "18:00", "a"),
            Slot::planned("18:00", "19:01", "b"),
        ],
    );
    let kinds: Vec<ConflictKind> = validate_plan(&plan, &tasks, "09:00", "19:00")
        .conflicts
        .into_iter()
        .map(|c| c.kind)
        .collect();
    assert_eq!(kinds, vec![ConflictKind::ExceedsWakingWindow]);
}

#[test]
fn autofix_keeps_lowest_id() {
    let tasks: Vec<Task> = ["3", "4", "1"]
        .into_iter()
        .map(|id| Task::flexible(id, "Journal", 15))
        .collect();
    let conflicts = validate_tasks(&tasks, None).conflicts;

    let mut attempted = Vec::new();
    let actions = auto_fix_duplicate_tasks(&conflicts, &tasks, |id| {
        attempted.push(id.to_string());
        if id == "4" { Err("store is read-only") } else { Ok(()) }
    });

    assert_eq!(attempted, vec!["3", "4"]);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kept_id, "1");
    assert_eq!(actions[0].deleted, vec!["3"]);
    assert_eq!(actions[0].failed[0].task_id, "4");
}

#[test]
fn conflict_kinds_use_snake_case_on_the_wire() {
    let json = serde_json::to_string(&ConflictKind::ExceedsWakingWindow).unwrap();
    assert_eq!(json, "\"exceeds_waking_window\"");
    let json = serde_json::to_string(&ConflictKind::InvalidDateTime).unwrap();
    assert_eq!(json, "\"invalid_datetime\"");
}
