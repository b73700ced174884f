use std::sync::Arc;

use serde_json::Value;
use tera::{Context, Tera};

use super::MailError;

/// Built-in templates as `(kind, html, text)`. Tera autoescapes the `.html`
/// names and leaves the `.txt` names alone.
const BUILTIN: [(&str, &str, &str); 5] = [
    (
        "update",
        include_str!("templates/update.html"),
        include_str!("templates/update.txt"),
    ),
    (
        "milestone",
        include_str!("templates/milestone.html"),
        include_str!("templates/milestone.txt"),
    ),
    (
        "welcome",
        include_str!("templates/welcome.html"),
        include_str!("templates/welcome.txt"),
    ),
    (
        "access_request",
        include_str!("templates/access_request.html"),
        include_str!("templates/access_request.txt"),
    ),
    (
        "test",
        include_str!("templates/test.html"),
        include_str!("templates/test.txt"),
    ),
];

/// HTML and plain-text bodies of one kind of email.
#[derive(Debug, Clone)]
pub struct EmailTemplate {
    tera: Arc<Tera>,
    name: &'static str,
}

impl EmailTemplate {
    /// Render `(html, text)`.
    pub fn render(&self, data: &Value) -> Result<(String, String), MailError> {
        let context = Context::from_value(data.clone())?;
        let html = self.tera.render(&format!("{}.html", self.name), &context)?;
        let text = self.tera.render(&format!("{}.txt", self.name), &context)?;
        Ok((html, text))
    }
}

#[derive(Debug, Clone)]
pub struct Templates {
    pub update: EmailTemplate,
    pub milestone: EmailTemplate,
    pub welcome: EmailTemplate,
    pub access_request: EmailTemplate,
    pub test: EmailTemplate,
}

impl Templates {
    /// Compile the built-in templates.
    pub fn load() -> Result<Self, MailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN.iter().flat_map(|(name, html, text)| {
            [(format!("{name}.html"), *html), (format!("{name}.txt"), *text)]
        }))?;
        let tera = Arc::new(tera);
        let template = |name| EmailTemplate {
            tera: Arc::clone(&tera),
            name,
        };

        Ok(Self {
            update: template("update"),
            milestone: template("milestone"),
            welcome: template("welcome"),
            access_request: template("access_request"),
            test: template("test"),
        })
    }
}
