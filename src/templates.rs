use std::sync::OnceLock;
use tera::{Context, Tera};

static TERA: OnceLock<Tera> = OnceLock::new();

const TEMPLATES: [(&str, &str); 3] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("error.html", include_str!("../templates/error.html")),
];

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(TEMPLATES) {
            tracing::error!("Failed to load templates: {}", e);
        }
        tera
    })
}

pub fn render(name: &str, ctx: &Context) -> String {
    get_tera().render(name, ctx).unwrap_or_else(|e| {
        tracing::error!("Template error in {}: {}", name, e);
        format!("Template error: {}", name)
    })
}
