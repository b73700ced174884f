//! Landing page for shared timeline links.
//!
//! Link previews in chat apps read the Open Graph tags.

use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use fortyweeks_core::mail::display_date;
use fortyweeks_core::models::Pregnancy;
use fortyweeks_core::store;
use html_escape::{encode_double_quoted_attribute, encode_text};

use super::shared_pregnancy;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/view/{share_id}", get(view))
}

async fn view(State(state): State<AppState>, Path(share_id): Path<String>) -> ApiResult<Html<String>> {
    let pregnancy = shared_pregnancy(&state, &share_id).await?;
    let owner_name = match store::users::find_by_id(state.pool(), pregnancy.user_id).await? {
        Some(owner) => owner.name,
        None => {
            tracing::warn!(pregnancy_id = pregnancy.id, "shared pregnancy has no owner");
            "Parent".to_string()
        }
    };
    Ok(Html(render(&pregnancy, &owner_name, &state.config().base_url, Utc::now())))
}

fn render(pregnancy: &Pregnancy, owner_name: &str, base_url: &str, now: DateTime<Utc>) -> String {
    let parents = pregnancy.parent_names(owner_name);
    let title = format!("Follow {parents}'s journey!");
    let description = format!(
        "Follow {parents}'s pregnancy journey. Currently at week {}, due {}",
        pregnancy.current_week(now),
        display_date(pregnancy.due_date),
    );
    let base = base_url.trim_end_matches('/');
    let url = format!("{base}/view/{}", pregnancy.share_id);

    let attr = |s: &str| encode_double_quoted_attribute(s).into_owned();
    let mut meta = vec![
        format!(r#"<meta name="description" content="{}">"#, attr(&description)),
        r#"<meta property="og:type" content="website">"#.to_string(),
        format!(r#"<meta property="og:url" content="{}">"#, attr(&url)),
        format!(r#"<meta property="og:title" content="{}">"#, attr(&title)),
        format!(r#"<meta property="og:description" content="{}">"#, attr(&description)),
        r#"<meta name="twitter:card" content="summary_large_image">"#.to_string(),
        format!(r#"<meta name="twitter:title" content="{}">"#, attr(&title)),
        format!(r#"<meta name="twitter:description" content="{}">"#, attr(&description)),
    ];
    if let Some(path) = pregnancy.cover_photo_path() {
        meta.push(format!(
            r#"<meta property="og:image" content="{}">"#,
            attr(&format!("{base}{path}"))
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
{meta}
</head>
<body data-share-id="{share_id}">
<h1>{title}</h1>
<p>{description}</p>
</body>
</html>
"#,
        title = encode_text(&title),
        description = encode_text(&description),
        meta = meta.join("\n"),
        share_id = attr(&pregnancy.share_id),
    )
}
