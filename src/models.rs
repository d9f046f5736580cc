use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Referral,
    Upsell,
    #[serde(rename = "Churn Risk")]
    ChurnRisk,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Referral, Tag::Upsell, Tag::ChurnRisk];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Referral => "Referral",
            Self::Upsell => "Upsell",
            Self::ChurnRisk => "Churn Risk",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == label)
    }
}

/// One customer account tracked in the book of business.
///
/// Date fields are free-form strings; nothing here parses them. Fields added
/// by later schema revisions default when absent so older blobs still load,
/// and fields this build does not know about ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub primary_contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub last_touch: String,
    #[serde(default)]
    pub last_contacted: String,
    #[serde(default)]
    pub signed_date: String,
    #[serde(default)]
    pub pipedrive_url: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub target: bool,
    #[serde(default)]
    pub hide_renewal: bool,
    /// Tag entries outside the vocabulary, written back into `tags` on save.
    #[serde(skip)]
    pub foreign_tags: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Row {
    pub fn create() -> Self {
        Self::with_id(new_row_id())
    }

    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            company: String::new(),
            primary_contact: String::new(),
            phone: String::new(),
            email: String::new(),
            last_touch: String::new(),
            last_contacted: String::new(),
            signed_date: String::new(),
            pipedrive_url: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            target: false,
            hide_renewal: false,
            foreign_tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Shallow merge. A supplied tag list replaces the known tags wholesale;
    /// foreign tags and unknown fields are untouched.
    pub fn apply_patch(&mut self, patch: RowPatch) {
        let RowPatch {
            company,
            primary_contact,
            phone,
            email,
            last_touch,
            last_contacted,
            signed_date,
            pipedrive_url,
            notes,
            tags,
            target,
            hide_renewal,
        } = patch;

        if let Some(value) = company {
            self.company = value;
        }
        if let Some(value) = primary_contact {
            self.primary_contact = value;
        }
        if let Some(value) = phone {
            self.phone = value;
        }
        if let Some(value) = email {
            self.email = value;
        }
        if let Some(value) = last_touch {
            self.last_touch = value;
        }
        if let Some(value) = last_contacted {
            self.last_contacted = value;
        }
        if let Some(value) = signed_date {
            self.signed_date = value;
        }
        if let Some(value) = pipedrive_url {
            self.pipedrive_url = value;
        }
        if let Some(value) = notes {
            self.notes = value;
        }
        if let Some(value) = tags {
            self.tags = value;
        }
        if let Some(value) = target {
            self.target = value;
        }
        if let Some(value) = hide_renewal {
            self.hide_renewal = value;
        }
    }
}

pub(crate) fn new_row_id() -> String {
    let short = Uuid::new_v4().simple().to_string();
    format!("row_{}", &short[..12])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowPatch {
    pub company: Option<String>,
    pub primary_contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub last_touch: Option<String>,
    pub last_contacted: Option<String>,
    pub signed_date: Option<String>,
    pub pipedrive_url: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub target: Option<bool>,
    pub hide_renewal: Option<bool>,
}

impl RowPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn tags(tags: Vec<Tag>) -> Self {
        Self {
            tags: Some(tags),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabView {
    BookOfBusiness,
    Referrals,
    Upsells,
    ChurnRisks,
    TodaysTargets,
    Renewals,
    MasterFlow,
    Reports,
}

impl TabView {
    pub const ALL: [TabView; 8] = [
        TabView::BookOfBusiness,
        TabView::Referrals,
        TabView::Upsells,
        TabView::ChurnRisks,
        TabView::TodaysTargets,
        TabView::Renewals,
        TabView::MasterFlow,
        TabView::Reports,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::BookOfBusiness => "Book of Business",
            Self::Referrals => "Referrals",
            Self::Upsells => "Upsells",
            Self::ChurnRisks => "Churn Risks",
            Self::TodaysTargets => "Today's Targets",
            Self::Renewals => "Renewals",
            Self::MasterFlow => "Master Flow",
            Self::Reports => "Reports",
        }
    }

    pub fn tag(self) -> Option<Tag> {
        match self {
            Self::Referrals => Some(Tag::Referral),
            Self::Upsells => Some(Tag::Upsell),
            Self::ChurnRisks => Some(Tag::ChurnRisk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Tags,
    Company,
    PrimaryContact,
    Phone,
    Email,
    LastTouch,
    LastContacted,
    SignedDate,
    PipedriveUrl,
    Notes,
    Target,
    HideRenewal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Company,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    /// Header click: the active column flips direction, any other column
    /// becomes active in ascending order.
    pub fn click(self, key: SortKey) -> Self {
        if self.key == key {
            let direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
            Self { key, direction }
        } else {
            Self {
                key,
                direction: SortDirection::Asc,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCounts {
    pub all: usize,
    pub referrals: usize,
    pub upsells: usize,
    pub churn_risks: usize,
    pub targets: usize,
}

impl ViewCounts {
    /// Summary card value for a tab. Reports has no card.
    pub fn for_tab(&self, tab: TabView) -> Option<usize> {
        match tab {
            TabView::BookOfBusiness | TabView::MasterFlow | TabView::Renewals => Some(self.all),
            TabView::Referrals => Some(self.referrals),
            TabView::Upsells => Some(self.upsells),
            TabView::ChurnRisks => Some(self.churn_risks),
            TabView::TodaysTargets => Some(self.targets),
            TabView::Reports => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalEntry {
    pub row: Row,
    pub next_renewal: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalPartition {
    pub scheduled: Vec<RenewalEntry>,
    pub unscheduled: Vec<RenewalEntry>,
    pub hidden: Vec<RenewalEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    pub storage_slot: String,
    pub seed_demo_rows: bool,
    pub default_sort: SortState,
    pub renewal_alert_days: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            storage_slot: "csw.book".to_string(),
            seed_demo_rows: false,
            default_sort: SortState::default(),
            renewal_alert_days: 60,
        }
    }
}
