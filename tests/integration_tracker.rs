use cs_workflow_lib::{
    bootstrap, renewals_list, row_add, row_delete, row_toggle_tag, row_update, rows_list, settings_get,
    settings_update, sort_column_click, view_counts, AppState, RowPatch, SortDirection, SortKey, TabView,
    Tag,
};

fn patch(company: &str, signed_date: &str) -> RowPatch {
    RowPatch {
        company: Some(company.to_string()),
        signed_date: Some(signed_date.to_string()),
        ..RowPatch::default()
    }
}

#[test]
fn edits_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let row_id = {
        let state = AppState::open(dir.path()).expect("open state");
        assert!(rows_list(&state, TabView::BookOfBusiness).expect("rows").is_empty());

        let row = row_add(&state).expect("add row");
        row_update(&state, row.id.clone(), patch("Stardust", "2024-01-15"))
            .expect("update")
            .expect("row exists");
        row_toggle_tag(&state, row.id.clone(), Tag::ChurnRisk).expect("toggle");
        row.id
    };

    let reopened = AppState::open(dir.path()).expect("reopen state");
    let churn = rows_list(&reopened, TabView::ChurnRisks).expect("churn rows");
    assert_eq!(churn.len(), 1);
    assert_eq!(churn[0].id, row_id);
    assert_eq!(churn[0].company, "Stardust");
    assert_eq!(churn[0].signed_date, "2024-01-15");
}

#[test]
fn tabs_counts_and_renewals_follow_mutations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::open(dir.path()).expect("open state");

    let a = row_add(&state).expect("add a");
    let b = row_add(&state).expect("add b");
    let c = row_add(&state).expect("add c");
    row_update(&state, a.id.clone(), patch("A", "2024-01-15")).expect("update a");
    row_update(&state, b.id.clone(), patch("B", "2023-06-01")).expect("update b");
    row_update(&state, c.id.clone(), patch("C", "")).expect("update c");
    row_toggle_tag(&state, a.id.clone(), Tag::Upsell).expect("tag a");
    row_toggle_tag(&state, a.id.clone(), Tag::Referral).expect("tag a again");
    row_update(
        &state,
        c.id.clone(),
        RowPatch {
            target: Some(true),
            ..RowPatch::default()
        },
    )
    .expect("target c");

    let counts = view_counts(&state).expect("counts");
    assert_eq!(counts.all, 3);
    assert_eq!(counts.upsells, 1);
    assert_eq!(counts.referrals, 1);
    assert_eq!(counts.targets, 1);

    let renewals: Vec<String> = rows_list(&state, TabView::Renewals)
        .expect("renewals")
        .into_iter()
        .map(|row| row.company)
        .collect();
    assert_eq!(renewals, vec!["B", "A", "C"]);

    row_update(
        &state,
        b.id.clone(),
        RowPatch {
            hide_renewal: Some(true),
            ..RowPatch::default()
        },
    )
    .expect("hide b");
    let partition = renewals_list(&state).expect("partition");
    assert_eq!(partition.scheduled.len(), 1);
    assert_eq!(partition.scheduled[0].row.company, "A");
    assert_eq!(partition.unscheduled[0].row.company, "C");
    assert_eq!(partition.hidden[0].row.company, "B");

    assert!(row_delete(&state, b.id.clone()).expect("delete"));
    assert!(!row_delete(&state, b.id).expect("delete again"));
    assert_eq!(view_counts(&state).expect("counts").all, 2);
}

#[test]
fn sort_state_is_kept_per_tab() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::open(dir.path()).expect("open state");
    for company in ["beta", "Alpha", "Gamma"] {
        let row = row_add(&state).expect("add");
        row_update(&state, row.id, patch(company, "")).expect("update");
    }

    let names = |tab| -> Vec<String> {
        rows_list(&state, tab)
            .expect("rows")
            .into_iter()
            .map(|row| row.company)
            .collect()
    };
    assert_eq!(names(TabView::BookOfBusiness), vec!["Alpha", "Gamma", "beta"]);

    let desc = sort_column_click(&state, TabView::BookOfBusiness, SortKey::Company).expect("click");
    assert_eq!(desc.direction, SortDirection::Desc);
    assert_eq!(names(TabView::BookOfBusiness), vec!["beta", "Gamma", "Alpha"]);

    let other = sort_column_click(&state, TabView::Referrals, SortKey::Email).expect("click other tab");
    assert_eq!(other.direction, SortDirection::Asc);
    assert_eq!(names(TabView::BookOfBusiness), vec!["beta", "Gamma", "Alpha"]);
}

#[test]
fn seeded_first_run_after_settings_change() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let state = bootstrap(dir.path()).expect("bootstrap");
        assert!(!settings_get(&state).expect("settings").seed_demo_rows);
        settings_update(&state, serde_json::json!({ "seedDemoRows": true, "storageSlot": "csw.demo" }))
            .expect("update settings");
    }
    assert!(dir.path().join("logs").is_dir());

    let state = AppState::open(dir.path()).expect("reopen");
    let counts = view_counts(&state).expect("counts");
    assert_eq!(counts.all, 4);
    assert_eq!(counts.referrals, 4);
    assert_eq!(counts.targets, 1);
}

#[test]
fn bootstrap_can_run_twice_in_one_process() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");

    let state = bootstrap(first.path()).expect("first bootstrap");
    row_add(&state).expect("add row");
    drop(state);

    let reopened = bootstrap(first.path()).expect("bootstrap again");
    assert_eq!(view_counts(&reopened).expect("counts").all, 1);
    bootstrap(second.path()).expect("bootstrap another dir");
    assert!(second.path().join("logs").is_dir());
}
