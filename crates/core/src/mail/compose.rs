//! Turns domain records into rendered [`OutgoingEmail`]s.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use super::{MailError, OutgoingEmail, Templates};
use crate::models::{AccessRequest, EmailKind, Milestone, Pregnancy, PregnancyUpdate, User, VillageMember};
use crate::models::user::first_name;

/// Sender identity and public URLs.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender_email: String,
    pub sender_name: String,
    pub base_url: String,
}

impl MailSettings {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// `"Name <address>"` for the From header.
    pub fn from_address(&self) -> String {
        format!("{} <{}>", self.sender_name, self.sender_email)
    }
}

/// Dates in emails and share pages read like "June 1, 2025".
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Pregnancy-wide values shared by every email about it.
#[derive(Debug, Clone)]
pub struct PregnancyContext<'a> {
    pub pregnancy: &'a Pregnancy,
    pub parent_names: String,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Composer {
    templates: Arc<Templates>,
    settings: MailSettings,
}

impl Composer {
    pub fn new(templates: Arc<Templates>, settings: MailSettings) -> Self {
        Self { templates, settings }
    }

    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    fn base_data(&self, ctx: &PregnancyContext<'_>, recipient_name: &str) -> Map<String, Value> {
        let p = ctx.pregnancy;
        let mut data = Map::new();
        data.insert("sender_name".into(), json!(self.settings.sender_name));
        data.insert("recipient_name".into(), json!(recipient_name));
        data.insert("parent_names".into(), json!(ctx.parent_names));
        data.insert("due_date".into(), json!(display_date(p.due_date)));
        data.insert("current_week".into(), json!(p.current_week(ctx.now)));
        data.insert("timeline_url".into(), json!(self.settings.url(&format!("/view/{}", p.share_id))));
        data.insert("year".into(), json!(ctx.now.year()));
        data.insert(
            "cover_photo_url".into(),
            json!(p.cover_photo_path().map(|path| self.settings.url(&path))),
        );
        data
    }

    fn unsubscribe_url(&self, member: &VillageMember) -> String {
        self.settings.url(&format!("/api/unsubscribe/{}", member.unsubscribe_token))
    }

    fn for_member(
        &self,
        member: &VillageMember,
        pregnancy_id: i64,
        kind: EmailKind,
        subject: String,
        (html, text): (String, String),
    ) -> OutgoingEmail {
        OutgoingEmail {
            to_email: member.email.clone(),
            to_name: member.name.clone(),
            subject,
            html,
            text,
            kind,
            pregnancy_id: Some(pregnancy_id),
            village_member_id: Some(member.id),
            update_id: None,
            milestone_id: None,
        }
    }

    pub fn update(
        &self,
        ctx: &PregnancyContext<'_>,
        update: &PregnancyUpdate,
        member: &VillageMember,
    ) -> Result<OutgoingEmail, MailError> {
        let mut data = self.base_data(ctx, first_name(&member.name));
        let first_photo_url = update
            .photos
            .iter()
            .find(|p| p.media_type == crate::models::MediaKind::Image)
            .map(|p| self.settings.url(&p.url_path(ctx.pregnancy.id)));
        data.insert(
            "update".into(),
            json!({
                "title": update.title,
                "content": update.content,
                "week": update.week_number,
                "date": display_date(update.effective_date().date_naive()),
                "photos": update.photos.iter().map(|p| p.filename.as_str()).collect::<Vec<_>>(),
                "first_photo_url": first_photo_url,
            }),
        );
        data.insert("unsubscribe_url".into(), json!(self.unsubscribe_url(member)));

        let body = self.templates.update.render(&Value::Object(data))?;
        let subject = update_subject(update.week_number, &ctx.parent_names);
        let mut email = self.for_member(member, ctx.pregnancy.id, EmailKind::Update, subject, body);
        email.update_id = Some(update.id);
        Ok(email)
    }

    pub fn milestone(
        &self,
        ctx: &PregnancyContext<'_>,
        milestone: &Milestone,
        member: &VillageMember,
    ) -> Result<OutgoingEmail, MailError> {
        let mut data = self.base_data(ctx, &member.name);
        data.insert(
            "milestone".into(),
            json!({
                "title": milestone.title,
                "week": milestone.week_number,
                "date": display_date(milestone.scheduled_date),
                "kind": display_type(&milestone.milestone_type),
            }),
        );
        data.insert("unsubscribe_url".into(), json!(self.unsubscribe_url(member)));

        let body = self.templates.milestone.render(&Value::Object(data))?;
        let subject = format!(
            "🎉 Milestone reached: Week {} - {}",
            milestone.week_number, milestone.title
        );
        let mut email = self.for_member(member, ctx.pregnancy.id, EmailKind::Milestone, subject, body);
        email.milestone_id = Some(milestone.id);
        Ok(email)
    }

    pub fn welcome(&self, ctx: &PregnancyContext<'_>, member: &VillageMember) -> Result<OutgoingEmail, MailError> {
        let mut data = self.base_data(ctx, &member.name);
        data.insert("unsubscribe_url".into(), json!(self.unsubscribe_url(member)));
        let body = self.templates.welcome.render(&Value::Object(data))?;
        let subject = format!("Welcome to {}'s pregnancy!", ctx.parent_names);
        Ok(self.for_member(member, ctx.pregnancy.id, EmailKind::Welcome, subject, body))
    }

    /// Tell the owner someone asked to follow the timeline.
    pub fn access_request(
        &self,
        ctx: &PregnancyContext<'_>,
        owner: &User,
        request: &AccessRequest,
    ) -> Result<OutgoingEmail, MailError> {
        let mut data = self.base_data(ctx, &owner.name);
        data.insert(
            "requester".into(),
            json!({
                "name": request.name,
                "email": request.email,
                "relationship": request.relationship,
                "message": request.message,
            }),
        );
        data.insert("dashboard_url".into(), json!(self.settings.url("/dashboard")));

        let (html, text) = self.templates.access_request.render(&Value::Object(data))?;
        Ok(OutgoingEmail {
            to_email: owner.email.clone(),
            to_name: owner.name.clone(),
            subject: "New access request for your pregnancy timeline".into(),
            html,
            text,
            kind: EmailKind::AccessRequest,
            pregnancy_id: Some(ctx.pregnancy.id),
            village_member_id: None,
            update_id: None,
            milestone_id: None,
        })
    }

    pub fn test(&self, to_email: &str, to_name: &str, now: DateTime<Utc>) -> Result<OutgoingEmail, MailError> {
        let data = json!({
            "sender_name": self.settings.sender_name,
            "recipient_name": to_name,
            "timeline_url": self.settings.url("/test"),
            "sent_at": now.format("%B %-d, %Y %-I:%M %p").to_string(),
        });
        let (html, text) = self.templates.test.render(&data)?;
        Ok(OutgoingEmail {
            to_email: to_email.to_string(),
            to_name: to_name.to_string(),
            subject: format!("Test Email from {}", self.settings.sender_name),
            html,
            text,
            kind: EmailKind::Test,
            pregnancy_id: None,
            village_member_id: None,
            update_id: None,
            milestone_id: None,
        })
    }
}

fn update_subject(week: Option<i64>, parent_names: &str) -> String {
    match week {
        Some(w) if w > 0 => format!("Week {w} Update from {parent_names}"),
        _ => format!("New update from {parent_names}"),
    }
}

/// `first_appointment` -> `First Appointment`.
fn display_type(s: &str) -> String {
    s.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn composer() -> Composer {
        Composer::new(
            Arc::new(Templates::load().unwrap()),
            MailSettings {
                sender_email: "noreply@40weeks.app".into(),
                sender_name: "40Weeks".into(),
                base_url: "https://40weeks.app/".into(),
            },
        )
    }

    fn pregnancy() -> Pregnancy {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Pregnancy {
            id: 9,
            user_id: 1,
            partner_name: Some("Alex Kim".into()),
            partner_email: None,
            due_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            conception_date: None,
            baby_name: None,
            is_active: true,
            share_id: "abc123".into(),
            cover_photo_filename: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn member() -> VillageMember {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        VillageMember {
            id: 4,
            pregnancy_id: 9,
            name: "Gran Smith".into(),
            email: "gran@x.com".into(),
            relationship: "grandmother".into(),
            is_told: true,
            told_date: None,
            is_subscribed: true,
            unsubscribe_token: "tok".into(),
            created_at: at,
            updated_at: at,
        }
    }

    fn update(week: Option<i64>) -> PregnancyUpdate {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        PregnancyUpdate {
            id: 7,
            pregnancy_id: 9,
            week_number: week,
            title: "Scan day".into(),
            content: Some("All good".into()),
            update_type: "general".into(),
            appointment_type: None,
            is_shared: true,
            shared_at: Some(at),
            update_date: None,
            created_at: at,
            updated_at: at,
            photos: Vec::new(),
        }
    }

    #[test]
    fn milestone_types_read_as_titles() {
        assert_eq!(display_type("first_appointment"), "First Appointment");
        assert_eq!(display_type("due_date"), "Due Date");
        assert_eq!(display_type(""), "");
    }

    #[test]
    fn display_date_matches_long_form() {
        assert_eq!(display_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()), "June 1, 2025");
    }

    #[test]
    fn update_email_uses_first_name_and_week_subject() {
        let composer = composer();
        let pregnancy = pregnancy();
        let ctx = PregnancyContext {
            pregnancy: &pregnancy,
            parent_names: "Sam Lee & Alex Kim".into(),
            now: Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap(),
        };

        let email = composer.update(&ctx, &update(Some(20)), &member()).unwrap();
        assert_eq!(email.subject, "Week 20 Update from Sam Lee & Alex Kim");
        assert_eq!(email.update_id, Some(7));
        assert_eq!(email.village_member_id, Some(4));
        assert!(email.text.contains("Hi Gran!"));
        assert!(email.text.contains("https://40weeks.app/view/abc123"));
        assert!(email.text.contains("https://40weeks.app/api/unsubscribe/tok"));

        let email = composer.update(&ctx, &update(None), &member()).unwrap();
        assert_eq!(email.subject, "New update from Sam Lee & Alex Kim");
    }

    #[test]
    fn test_email_subject_names_sender() {
        let email = composer()
            .test("ops@x.com", "Ops", Utc.with_ymd_and_hms(2025, 1, 2, 15, 4, 0).unwrap())
            .unwrap();
        assert_eq!(email.subject, "Test Email from 40Weeks");
        assert!(email.text.contains("Sent at: January 2, 2025 3:04 PM"));
        assert_eq!(email.kind, EmailKind::Test);
    }
}
