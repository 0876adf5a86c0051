//! Records shared by the API handlers, the stores and the client.
//!
//! Every resource comes in three shapes: the stored record, a `New*` body
//! accepted on create, and a `*Patch` body accepted on update where only the
//! supplied fields change.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A stored enum value that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum persisted and serialized as its display text.
macro_rules! text_enum {
    (
        $(#[$meta:meta])* $name:ident : $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum! {
    /// Position of a deal in the sales pipeline.
    DealStage: "deal stage" {
        #[default]
        Lead => "Lead",
        Discussion => "Discussion",
        Negotiation => "Negotiation",
        Proposal => "Proposal",
        Won => "Won",
        Closed => "Closed",
    }
}

text_enum! {
    /// Column of a task on the tasks board.
    TaskStage: "task stage" {
        #[default]
        ToDo => "To Do",
        InProgress => "In Progress",
        InReview => "In Review",
        Done => "Done",
    }
}

text_enum! {
    TaskPriority: "task priority" {
        Low => "Low",
        #[default]
        Medium => "Medium",
        High => "High",
    }
}

text_enum! {
    ContactStatus: "contact status" {
        Active => "Active",
        Inactive => "Inactive",
        #[default]
        Lead => "Lead",
    }
}

text_enum! {
    InvoiceStatus: "invoice status" {
        Paid => "Paid",
        #[default]
        Pending => "Pending",
        Overdue => "Overdue",
    }
}

/// Fails with the name of the first blank required field.
fn require(fields: &[(&'static str, &str)]) -> Result<(), String> {
    match fields.iter().find(|(_, v)| v.trim().is_empty()) {
        Some((name, _)) => Err(format!("{} is required", name)),
        None => Ok(()),
    }
}

/// Like [`require`], for fields an update may leave out but not blank.
fn require_if_present(fields: &[(&'static str, Option<&str>)]) -> Result<(), String> {
    let present: Vec<(&'static str, &str)> = fields
        .iter()
        .filter_map(|(name, v)| v.map(|v| (*name, v)))
        .collect();
    require(&present)
}

fn patch<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

// ---- contacts ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: ContactStatus,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContactStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl NewContact {
    pub fn validate(&self) -> Result<(), String> {
        require(&[("name", self.name.as_str()), ("email", self.email.as_str())])
    }

    pub fn into_record(self, id: i32) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            status: self.status,
            avatar: self.avatar,
        }
    }
}

impl ContactPatch {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present(&[
            ("name", self.name.as_deref()),
            ("email", self.email.as_deref()),
        ])
    }

    pub fn apply(self, c: &mut Contact) {
        patch(&mut c.name, self.name);
        patch(&mut c.email, self.email);
        patch(&mut c.status, self.status);
        if self.phone.is_some() {
            c.phone = self.phone;
        }
        if self.company.is_some() {
            c.company = self.company;
        }
        if self.avatar.is_some() {
            c.avatar = self.avatar;
        }
    }
}

// ---- deals ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub value: f64,
    pub stage: DealStage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeal {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub stage: DealStage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
}

impl NewDeal {
    pub fn validate(&self) -> Result<(), String> {
        require(&[("title", self.title.as_str()), ("company", self.company.as_str())])?;
        if !self.value.is_finite() {
            return Err("value must be a finite number".into());
        }
        Ok(())
    }

    pub fn into_record(self, id: i32) -> Deal {
        Deal {
            id,
            title: self.title,
            company: self.company,
            value: self.value,
            stage: self.stage,
        }
    }
}

impl DealPatch {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present(&[
            ("title", self.title.as_deref()),
            ("company", self.company.as_deref()),
        ])?;
        if matches!(self.value, Some(v) if !v.is_finite()) {
            return Err("value must be a finite number".into());
        }
        Ok(())
    }

    pub fn apply(self, d: &mut Deal) {
        patch(&mut d.title, self.title);
        patch(&mut d.company, self.company);
        patch(&mut d.value, self.value);
        patch(&mut d.stage, self.stage);
    }
}

/// A deal as listed on the dashboard, tagged with a display colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentDeal {
    #[serde(flatten)]
    pub deal: Deal,
    pub color: String,
}

// ---- tasks ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub tag: String,
    pub stage: TaskStage,
    pub priority: TaskPriority,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub stage: TaskStage,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_tag() -> String {
    "General".into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<TaskStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), String> {
        require(&[("title", self.title.as_str())])
    }

    pub fn into_record(self, id: i32) -> Task {
        Task {
            id,
            title: self.title,
            tag: self.tag,
            stage: self.stage,
            priority: self.priority,
            color: self.color,
        }
    }
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present(&[("title", self.title.as_deref())])
    }

    pub fn apply(self, t: &mut Task) {
        patch(&mut t.title, self.title);
        patch(&mut t.tag, self.tag);
        patch(&mut t.stage, self.stage);
        patch(&mut t.priority, self.priority);
        if self.color.is_some() {
            t.color = self.color;
        }
    }
}

// ---- backlog ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBacklogItem {
    pub title: String,
    #[serde(rename = "type", default = "default_tag")]
    pub kind: String,
    #[serde(default = "default_points")]
    pub points: i32,
}

fn default_points() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacklogItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

impl NewBacklogItem {
    pub fn validate(&self) -> Result<(), String> {
        require(&[("title", self.title.as_str())])?;
        if self.points < 0 {
            return Err("points must not be negative".into());
        }
        Ok(())
    }

    pub fn into_record(self, id: i32) -> BacklogItem {
        BacklogItem {
            id,
            title: self.title,
            kind: self.kind,
            points: self.points,
        }
    }
}

impl BacklogItemPatch {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present(&[("title", self.title.as_deref())])?;
        if matches!(self.points, Some(p) if p < 0) {
            return Err("points must not be negative".into());
        }
        Ok(())
    }

    pub fn apply(self, b: &mut BacklogItem) {
        patch(&mut b.title, self.title);
        patch(&mut b.kind, self.kind);
        patch(&mut b.points, self.points);
    }
}

// ---- invoices ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub client: String,
    pub amount: f64,
    pub date: String,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Caller-chosen id such as `INV-001`; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub client: String,
    pub amount: f64,
    /// `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
}

impl NewInvoice {
    pub fn validate(&self) -> Result<(), String> {
        require(&[("client", self.client.as_str())])?;
        if let Some(id) = &self.id {
            require(&[("id", id.as_str())])?;
        }
        if !self.amount.is_finite() {
            return Err("amount must be a finite number".into());
        }
        Ok(())
    }
}

impl InvoicePatch {
    pub fn validate(&self) -> Result<(), String> {
        require_if_present(&[("client", self.client.as_deref())])?;
        if matches!(self.amount, Some(a) if !a.is_finite()) {
            return Err("amount must be a finite number".into());
        }
        Ok(())
    }

    pub fn apply(self, i: &mut Invoice) {
        patch(&mut i.client, self.client);
        patch(&mut i.amount, self.amount);
        patch(&mut i.date, self.date);
        patch(&mut i.status, self.status);
    }
}

// ---- users ----

/// Role label reported for a logged-in user.
pub const ROLE_ADMIN: &str = "Admin";
/// Role label reported right after registration.
pub const ROLE_NEW_USER: &str = "New User";

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

// ---- typed resource paths ----

/// A CRUD collection exposed under `/api/<PATH>`.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    const PATH: &'static str;
    type Id: fmt::Display + Send + Sync;
    type New: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;
}

/// A resource laid out as a kanban board by its stage.
pub trait Staged: Resource<Id = i32> + Clone {
    type Stage: Copy + PartialEq + fmt::Debug + Send + Sync;

    fn id(&self) -> i32;
    fn stage(&self) -> Self::Stage;
    fn set_stage(&mut self, stage: Self::Stage);
    fn stage_patch(stage: Self::Stage) -> Self::Patch;
}

impl Resource for Contact {
    const PATH: &'static str = "contacts";
    type Id = i32;
    type New = NewContact;
    type Patch = ContactPatch;
}

impl Resource for Deal {
    const PATH: &'static str = "deals";
    type Id = i32;
    type New = NewDeal;
    type Patch = DealPatch;
}

impl Resource for Task {
    const PATH: &'static str = "tasks";
    type Id = i32;
    type New = NewTask;
    type Patch = TaskPatch;
}

impl Resource for BacklogItem {
    const PATH: &'static str = "backlog";
    type Id = i32;
    type New = NewBacklogItem;
    type Patch = BacklogItemPatch;
}

impl Resource for Invoice {
    const PATH: &'static str = "invoices";
    type Id = String;
    type New = NewInvoice;
    type Patch = InvoicePatch;
}

impl Staged for Deal {
    type Stage = DealStage;

    fn id(&self) -> i32 {
        self.id
    }
    fn stage(&self) -> DealStage {
        self.stage
    }
    fn set_stage(&mut self, stage: DealStage) {
        self.stage = stage;
    }
    fn stage_patch(stage: DealStage) -> DealPatch {
        DealPatch {
            stage: Some(stage),
            ..Default::default()
        }
    }
}

impl Staged for Task {
    type Stage = TaskStage;

    fn id(&self) -> i32 {
        self.id
    }
    fn stage(&self) -> TaskStage {
        self.stage
    }
    fn set_stage(&mut self, stage: TaskStage) {
        self.stage = stage;
    }
    fn stage_patch(stage: TaskStage) -> TaskPatch {
        TaskPatch {
            stage: Some(stage),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_use_display_text_on_the_wire() {
        let json = serde_json::to_string(&TaskStage::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let stage: TaskStage = serde_json::from_str("\"To Do\"").unwrap();
        assert_eq!(stage, TaskStage::ToDo);
        assert!(serde_json::from_str::<DealStage>("\"Lost\"").is_err());
    }

    #[test]
    fn every_variant_parses_back_from_its_text() {
        for stage in DealStage::ALL {
            assert_eq!(stage.as_str().parse::<DealStage>().unwrap(), *stage);
        }
        for stage in TaskStage::ALL {
            assert_eq!(stage.as_str().parse::<TaskStage>().unwrap(), *stage);
        }
        let err = "Archived".parse::<InvoiceStatus>().unwrap_err();
        assert_eq!(err.kind, "invoice status");
    }

    #[test]
    fn defaults_come_from_the_marked_variant() {
        assert_eq!(DealStage::default(), DealStage::Lead);
        assert_eq!(TaskStage::default(), TaskStage::ToDo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!(ContactStatus::default(), ContactStatus::Lead);
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Pending);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut task = Task {
            id: 7,
            title: "API Integration".into(),
            tag: "Backend".into(),
            stage: TaskStage::ToDo,
            priority: TaskPriority::Medium,
            color: Some("bg-blue-500".into()),
        };
        let patch: TaskPatch = serde_json::from_str(r#"{"stage":"Done"}"#).unwrap();
        patch.apply(&mut task);
        assert_eq!(task.stage, TaskStage::Done);
        assert_eq!(task.title, "API Integration");
        assert_eq!(task.color.as_deref(), Some("bg-blue-500"));
    }

    #[test]
    fn new_deal_defaults_and_validation() {
        let deal: NewDeal = serde_json::from_str(r#"{"title":"X","company":"Y"}"#).unwrap();
        assert_eq!(deal.stage, DealStage::Lead);
        assert_eq!(deal.value, 0.0);
        assert!(deal.validate().is_ok());

        let blank: NewDeal = serde_json::from_str(r#"{"title":"  ","company":"Y"}"#).unwrap();
        assert_eq!(blank.validate().unwrap_err(), "title is required");
    }

    #[test]
    fn patches_refuse_blank_required_fields() {
        let deal: DealPatch = serde_json::from_str(r#"{"title":"   ","company":""}"#).unwrap();
        assert_eq!(deal.validate().unwrap_err(), "title is required");

        let invoice: InvoicePatch = serde_json::from_str(r#"{"client":""}"#).unwrap();
        assert_eq!(invoice.validate().unwrap_err(), "client is required");

        let contact: ContactPatch = serde_json::from_str(r#"{"email":" "}"#).unwrap();
        assert_eq!(contact.validate().unwrap_err(), "email is required");

        let task: TaskPatch = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(task.validate().is_err());

        let item: BacklogItemPatch = serde_json::from_str(r#"{"points":-5}"#).unwrap();
        assert!(item.validate().is_err());

        // Leaving a field out is fine; only supplied values are checked.
        let stage_only: TaskPatch = serde_json::from_str(r#"{"stage":"Done"}"#).unwrap();
        assert!(stage_only.validate().is_ok());
    }

    #[test]
    fn backlog_kind_is_serialized_as_type() {
        let item = BacklogItem {
            id: 1,
            title: "Update Privacy Policy".into(),
            kind: "Legal".into(),
            points: 1,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "Legal");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn recent_deal_flattens_the_deal() {
        let recent = RecentDeal {
            deal: Deal {
                id: 3,
                title: "Training Package".into(),
                company: "Startup Inc".into(),
                value: 3500.0,
                stage: DealStage::Won,
            },
            color: "bg-rose-500".into(),
        };
        let json = serde_json::to_value(&recent).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["stage"], "Won");
        assert_eq!(json["color"], "bg-rose-500");
    }
}
