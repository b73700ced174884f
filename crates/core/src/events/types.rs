use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kinds of timeline events recorded by domain operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EventKind {
    PregnancyAnnounced,
    VillagerJoined,
    VillagerTold,
    MilestoneReached,
    AppointmentCompleted,
    UpdatePosted,
    WeekProgression,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PregnancyAnnounced => "pregnancy_announced",
            EventKind::VillagerJoined => "villager_joined",
            EventKind::VillagerTold => "villager_told",
            EventKind::MilestoneReached => "milestone_reached",
            EventKind::AppointmentCompleted => "appointment_completed",
            EventKind::UpdatePosted => "update_posted",
            EventKind::WeekProgression => "week_progression",
        }
    }
}

/// How a village member came to be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSource {
    /// Added by the pregnancy owner.
    Manual,
    /// Joined through an invite link.
    Invite,
    /// Owner approved their access request.
    AccessRequest,
}

/// An event about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    pub data: Option<Value>,
    pub week_number: Option<i64>,
    pub created_by: Option<i64>,
}

impl NewEvent {
    pub fn pregnancy_announced(user_id: i64, week_number: Option<i64>) -> Self {
        Self {
            kind: EventKind::PregnancyAnnounced,
            title: "Pregnancy begins! 🎉".into(),
            description: Some("Your pregnancy tracking has been set up and your journey begins!".into()),
            data: None,
            week_number,
            created_by: Some(user_id),
        }
    }

    /// Every way of joining the village records `villager_joined`; only the
    /// wording differs.
    pub fn villager_joined(
        source: JoinSource,
        name: &str,
        relationship: &str,
        week_number: Option<i64>,
        owner_id: i64,
    ) -> Self {
        let (title, description, created_by) = match source {
            JoinSource::Manual => (
                format!("Added {name} to your village"),
                format!("{name} ({relationship}) has been added to your pregnancy village"),
                Some(owner_id),
            ),
            JoinSource::Invite => (
                format!("{name} joined your village"),
                format!("{name} ({relationship}) has joined your pregnancy village through your invite link"),
                None,
            ),
            JoinSource::AccessRequest => (
                format!("{name} joined your village"),
                format!("{name} ({relationship}) was approved to follow your pregnancy"),
                Some(owner_id),
            ),
        };
        Self {
            kind: EventKind::VillagerJoined,
            title,
            description: Some(description),
            data: Some(json!({ "villager_name": name, "relationship": relationship })),
            week_number,
            created_by,
        }
    }

    pub fn villager_told(name: &str, user_id: i64, week_number: Option<i64>) -> Self {
        Self {
            kind: EventKind::VillagerTold,
            title: format!("Told {name} about pregnancy"),
            description: Some(format!("{name} now knows about your pregnancy")),
            data: Some(json!({ "villager_name": name })),
            week_number,
            created_by: Some(user_id),
        }
    }

    pub fn milestone_reached(title: &str, week: i64, user_id: i64) -> Self {
        Self {
            kind: EventKind::MilestoneReached,
            title: format!("Week {week} milestone: {title}"),
            description: Some(format!("You've reached week {week} of your pregnancy!")),
            data: Some(json!({ "milestone_title": title })),
            week_number: Some(week),
            created_by: Some(user_id),
        }
    }

    pub fn update_shared(
        user_name: &str,
        update_title: &str,
        summary: &str,
        week_number: Option<i64>,
        user_id: i64,
    ) -> Self {
        let title = format!("{user_name} shared an update");
        let description = if summary.is_empty() { title.clone() } else { summary.to_string() };
        Self {
            kind: EventKind::UpdatePosted,
            title,
            description: Some(description),
            data: Some(json!({ "update_title": update_title })),
            week_number,
            created_by: Some(user_id),
        }
    }
}
