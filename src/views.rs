use crate::models::{Row, SortDirection, SortKey, SortState, TabView, Tag, ViewCounts};
use crate::renewals;
use std::cmp::Ordering;

impl TabView {
    pub fn includes(self, row: &Row) -> bool {
        match self {
            Self::BookOfBusiness | Self::Renewals | Self::MasterFlow => true,
            Self::Referrals | Self::Upsells | Self::ChurnRisks => {
                self.tag().map(|tag| row.has_tag(tag)).unwrap_or(false)
            }
            Self::TodaysTargets => row.target,
            Self::Reports => false,
        }
    }
}

/// Rows for a tab, in the order the tab shows them.
///
/// List tabs filter then apply `sort` when given. Renewals ignores `sort` and
/// uses renewal order; Master Flow keeps collection order; Reports has no rows.
pub fn project(rows: &[Row], tab: TabView, sort: Option<&SortState>) -> Vec<Row> {
    match tab {
        TabView::Reports => Vec::new(),
        TabView::MasterFlow => rows.to_vec(),
        TabView::Renewals => renewals::renewal_order(rows)
            .into_iter()
            .map(|entry| entry.row)
            .collect(),
        _ => {
            let mut visible: Vec<Row> = rows.iter().filter(|row| tab.includes(row)).cloned().collect();
            if let Some(sort) = sort {
                sort_rows(&mut visible, sort);
            }
            visible
        }
    }
}

pub fn sort_rows(rows: &mut [Row], sort: &SortState) {
    rows.sort_by(|a, b| {
        let ordering = compare_rows(a, b, sort.key);
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn compare_rows(a: &Row, b: &Row, key: SortKey) -> Ordering {
    match key {
        SortKey::Tags => tag_label(&a.tags).cmp(&tag_label(&b.tags)),
        SortKey::Company => a.company.cmp(&b.company),
        SortKey::PrimaryContact => a.primary_contact.cmp(&b.primary_contact),
        SortKey::Phone => a.phone.cmp(&b.phone),
        SortKey::Email => a.email.cmp(&b.email),
        SortKey::LastTouch => a.last_touch.cmp(&b.last_touch),
        SortKey::LastContacted => a.last_contacted.cmp(&b.last_contacted),
        SortKey::SignedDate => a.signed_date.cmp(&b.signed_date),
        SortKey::PipedriveUrl => a.pipedrive_url.cmp(&b.pipedrive_url),
        SortKey::Notes => a.notes.cmp(&b.notes),
        SortKey::Target => u8::from(a.target).cmp(&u8::from(b.target)),
        SortKey::HideRenewal => u8::from(a.hide_renewal).cmp(&u8::from(b.hide_renewal)),
    }
}

fn tag_label(tags: &[Tag]) -> String {
    tags.iter().map(|tag| tag.as_str()).collect::<Vec<_>>().join(",")
}

pub fn counts(rows: &[Row]) -> ViewCounts {
    let tagged = |tag: Tag| rows.iter().filter(|row| row.has_tag(tag)).count();
    ViewCounts {
        all: rows.len(),
        referrals: tagged(Tag::Referral),
        upsells: tagged(Tag::Upsell),
        churn_risks: tagged(Tag::ChurnRisk),
        targets: rows.iter().filter(|row| row.target).count(),
    }
}
