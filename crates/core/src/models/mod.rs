pub mod access_request;
pub mod event;
pub mod milestone;
pub mod notification;
pub mod pregnancy;
pub mod update;
pub mod user;
pub mod village;

pub use access_request::{AccessRequest, AccessRequestStatus, NewAccessRequest};
pub use event::PregnancyEvent;
pub use milestone::Milestone;
pub use notification::{DeliveryStatus, EmailKind, EmailNotification, NotificationSummary};
pub use pregnancy::{NewPregnancy, Pregnancy, PregnancyChanges, PregnancyView};
pub use update::{MediaKind, NewUpdate, NewUpdatePhoto, PregnancyUpdate, UpdateChanges, UpdatePhoto};
pub use user::User;
pub use village::{NewVillageMember, VillageMember};
